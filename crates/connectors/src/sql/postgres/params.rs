use crate::sql::{
    base::error::DbError,
    postgres::{coercion::coerce_param, numeric::PgNumeric},
};
use model::core::value::Value;
use tokio_postgres::types::{Json as PgJson, ToSql, Type};

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::SmallInt(v) => PgParam(Box::new(v)),
            Value::Int32(v) => PgParam(Box::new(v)),
            Value::Int(v) => PgParam(Box::new(v)),
            Value::Uint(v) => PgParam(Box::new(PgNumeric(v.into()))),
            Value::Float32(v) => PgParam(Box::new(v)),
            Value::Float(v) => PgParam(Box::new(v)),
            Value::Decimal(v) => PgParam(Box::new(PgNumeric(v))),
            Value::String(v) => PgParam(Box::new(v)),
            Value::Boolean(v) => PgParam(Box::new(v)),
            Value::Json(v) => PgParam(Box::new(PgJson(v))),
            Value::Uuid(v) => PgParam(Box::new(v)),
            Value::Bytes(v) => PgParam(Box::new(v)),
            Value::Date(v) => PgParam(Box::new(v)),
            Value::Time(v) => PgParam(Box::new(v)),
            Value::Timestamp(v) => PgParam(Box::new(v)),
            Value::TimestampNaive(v) => PgParam(Box::new(v)),
            Value::Null => PgParam(Box::new(Option::<String>::None)),
        }
    }
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    /// Binds `values` against the parameter types of a prepared statement.
    pub fn typed(values: Vec<Value>, types: &[Type]) -> Result<Self, DbError> {
        if values.len() != types.len() {
            return Err(DbError::Bind(format!(
                "statement expects {} parameters, got {}",
                types.len(),
                values.len()
            )));
        }
        let params = values
            .into_iter()
            .zip(types)
            .map(|(value, ty)| coerce_param(value, ty).map(PgParam::from_value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { params })
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_store_checks_arity() {
        let err = PgParamStore::typed(vec![Value::Int(1)], &[]).err().unwrap();
        assert!(matches!(err, DbError::Bind(_)));

        let store = PgParamStore::typed(
            vec![Value::Int32(5), Value::Int(10)],
            &[Type::INT8, Type::INT8],
        )
        .unwrap();
        assert_eq!(store.as_refs().len(), 2);
    }
}
