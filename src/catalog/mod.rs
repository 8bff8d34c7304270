//! Catalog module
//!
//! This module contains the system catalog, descriptors, privileges and data types.

pub mod catalog;
pub mod constraint;
pub mod descriptor;
pub mod privilege;
pub mod types;
pub mod virtual_schema;

pub use catalog::{
    Catalog, CatalogState, GrantTarget, IndexSpec, InterleaveSpec, QualifiedName, TableBuilder,
};
pub use constraint::{ConstraintDetail, ConstraintInfo, ConstraintKind};
pub use descriptor::{
    CheckConstraint, ColumnDescriptor, DatabaseDescriptor, DescriptorId, Direction,
    FamilyDescriptor, ForeignKeyReference, IndexDescriptor, InterleaveAncestor, TableDescriptor,
    Validity,
};
pub use privilege::{Privilege, PrivilegeDescriptor, ROOT_USER};
pub use types::DataType;
pub use virtual_schema::{InformationSchema, INFORMATION_SCHEMA};
