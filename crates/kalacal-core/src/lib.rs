//! kalacal-core
//!
//! Clinical field table, prediction model catalog, patient input values and
//! the validator that gates every explanation request. Pure data, no network
//! or filesystem dependency.

pub mod catalog;
pub mod error;
pub mod fields;
pub mod input;
pub mod validate;

pub use catalog::{Catalog, ModelDescriptor, RangeRule, ResolvedModel, AUTO_DETECTED};
pub use error::{CatalogError, InputError};
pub use fields::{FieldDescriptor, FieldKind};
pub use input::{PatientInput, PatientValue};
pub use validate::{ValidatedInput, ValidationResult, Validator};
