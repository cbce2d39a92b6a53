use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Sqlite, Type};

use common::linked_data::ObjectId;

/// Object id stored as lowercase hex TEXT
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct DObjectId(ObjectId);

impl From<DObjectId> for ObjectId {
    fn from(val: DObjectId) -> Self {
        val.0
    }
}

impl From<ObjectId> for DObjectId {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

impl Decode<'_, Sqlite> for DObjectId {
    fn decode(value: SqliteValueRef<'_>) -> Result<Self, BoxDynError> {
        let db_val = <String as Decode<Sqlite>>::decode(value)?;
        Ok(Self(ObjectId::from_hex(&db_val)?))
    }
}

impl Encode<'_, Sqlite> for DObjectId {
    fn encode_by_ref(
        &self,
        args: &mut Vec<SqliteArgumentValue<'_>>,
    ) -> Result<IsNull, BoxDynError> {
        args.push(SqliteArgumentValue::Text(self.0.to_hex().into()));
        Ok(IsNull::No)
    }
}

impl Type<Sqlite> for DObjectId {
    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <String as Type<Sqlite>>::compatible(ty)
    }

    fn type_info() -> SqliteTypeInfo {
        <String as Type<Sqlite>>::type_info()
    }
}
