mod dobject_id;
mod duuid;

pub use dobject_id::DObjectId;
pub use duuid::DUuid;
