crate::resource! {
    /// Account in the auth service.
    pub struct User {
        id: String => read_only(),
        username: String,
        email: String => nullable(),
        display_name: String => wire("displayName").nullable(),
        password: String => write_only(),
        roles: Vec<String>,
        enabled: bool = true,
        created_at: String => wire("createdTimestamp").read_only(),
    }
}
