pub mod registry;
pub mod schema;

pub use registry::{
    generate_constraints, validate_parameters, ParameterIssue, ParameterReport, RegistryError,
    RegistryParameters, SportProfile,
};
pub use schema::{
    clamp_weight, constraint_fingerprint, Constraint, ConstraintCategory, ConstraintType,
    EnumParseError, Gender, Hardness, ParameterValue, Severity, Sport, unique_id,
};
