crate::resource! {
    /// Free-form text parameter.
    pub struct StringParameter {
        name: String,
        description: String => nullable(),
        default_value: String => wire("default").nullable(),
        max_length: i64 => wire("maxLength").nullable(),
    }
}

crate::resource! {
    /// Filesystem path parameter; same shape as [`StringParameter`].
    pub struct PathParameter {
        name: String,
        description: String => nullable(),
        default_value: String => wire("default").nullable(),
        max_length: i64 => wire("maxLength").nullable(),
    }
}

crate::resource! {
    pub struct IntegerParameter {
        name: String,
        description: String => nullable(),
        default_value: i64 => wire("default").nullable(),
        minimum: i64 => nullable(),
        maximum: i64 => nullable(),
    }
}

crate::resource! {
    pub struct FloatParameter {
        name: String,
        description: String => nullable(),
        default_value: f64 => wire("default").nullable(),
        minimum: f64 => nullable(),
        maximum: f64 => nullable(),
    }
}

crate::resource! {
    pub struct BooleanParameter {
        name: String,
        description: String => nullable(),
        default_value: bool = false => wire("default"),
    }
}

crate::resource! {
    /// One value out of a fixed list.
    pub struct ChoiceParameter {
        name: String,
        description: String => nullable(),
        choices: Vec<String>,
        default_value: String => wire("default").nullable(),
    }
}

crate::one_of! {
    /// Parameter definition of a job, selected by its `type` tag.
    pub enum ParameterDefinition("type") {
        String(StringParameter) = "string",
        Path(PathParameter) = "path",
        Integer(IntegerParameter) = "integer",
        Float(FloatParameter) = "float",
        Boolean(BooleanParameter) = "boolean",
        Choice(ChoiceParameter) = "choice",
    }
}
