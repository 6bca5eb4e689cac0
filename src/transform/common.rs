use std::any::Any;
use std::fmt::Display;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use crate::error::TransformError;
use crate::traits::RowTransform;
use crate::types::{Outcome, Row};

/// Aplica a transformação isolando pânicos por registro.
///
/// Um pânico vira `TransformError::Panicked` e o worker segue no laço, então a
/// capacidade do pool nunca diminui.
pub fn apply_guarded<I, O, T>(transform: &T, record: I) -> Outcome<O>
where
    T: RowTransform<I, O> + ?Sized,
{
    match catch_unwind(AssertUnwindSafe(|| transform.apply(record))) {
        Ok(outcome) => outcome,
        Err(payload) => Outcome::Fail(TransformError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pânico sem mensagem".to_string()
    }
}

/// Transformador que mapeia cada registro; sempre emite
pub struct MapTransform<F, I> {
    map_fn: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I, O> MapTransform<F, I>
where
    F: Fn(I) -> O + Send + Sync + 'static,
{
    pub fn new(map_fn: F) -> Self {
        Self { map_fn, _input: PhantomData }
    }
}

impl<F, I, O> RowTransform<I, O> for MapTransform<F, I>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    I: 'static,
{
    fn apply(&self, record: I) -> Outcome<O> {
        Outcome::Emit((self.map_fn)(record))
    }
}

/// Transformador em que `None` é o sinal explícito de descarte
pub struct FilterMapTransform<F, I> {
    filter_map_fn: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I, O> FilterMapTransform<F, I>
where
    F: Fn(I) -> Option<O> + Send + Sync + 'static,
{
    pub fn new(filter_map_fn: F) -> Self {
        Self { filter_map_fn, _input: PhantomData }
    }
}

impl<F, I, O> RowTransform<I, O> for FilterMapTransform<F, I>
where
    F: Fn(I) -> Option<O> + Send + Sync + 'static,
    I: 'static,
{
    fn apply(&self, record: I) -> Outcome<O> {
        (self.filter_map_fn)(record).into()
    }
}

/// Transformador falível: `Err` descarta o registro e é reportado
pub struct TryMapTransform<F, I> {
    try_fn: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I, O, E> TryMapTransform<F, I>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    E: Display,
{
    pub fn new(try_fn: F) -> Self {
        Self { try_fn, _input: PhantomData }
    }
}

impl<F, I, O, E> RowTransform<I, O> for TryMapTransform<F, I>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    E: Display,
    I: 'static,
{
    fn apply(&self, record: I) -> Outcome<O> {
        match (self.try_fn)(record) {
            Ok(record) => Outcome::Emit(record),
            Err(err) => Outcome::Fail(TransformError::failed(err)),
        }
    }
}

/// Transformador com controle total sobre o `Outcome`
pub struct OutcomeTransform<F, I> {
    outcome_fn: F,
    _input: PhantomData<fn(I)>,
}

impl<F, I, O> OutcomeTransform<F, I>
where
    F: Fn(I) -> Outcome<O> + Send + Sync + 'static,
{
    pub fn new(outcome_fn: F) -> Self {
        Self { outcome_fn, _input: PhantomData }
    }
}

impl<F, I, O> RowTransform<I, O> for OutcomeTransform<F, I>
where
    F: Fn(I) -> Outcome<O> + Send + Sync + 'static,
    I: 'static,
{
    fn apply(&self, record: I) -> Outcome<O> {
        (self.outcome_fn)(record)
    }
}

/// Devolve o registro sem alterações
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTransform;

impl<T: 'static> RowTransform<T, T> for PassthroughTransform {
    fn apply(&self, record: T) -> Outcome<T> {
        Outcome::Emit(record)
    }
}

/// Acrescenta a soma inteira dos campos como nova coluna
///
/// Campos que não são inteiros fazem o registro falhar.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendSumTransform;

impl RowTransform<Row, Row> for AppendSumTransform {
    fn apply(&self, mut row: Row) -> Outcome<Row> {
        let mut sum: i64 = 0;
        for (i, field) in row.iter().enumerate() {
            match field.trim().parse::<i64>() {
                Ok(value) => sum = sum.saturating_add(value),
                Err(_) => {
                    return Outcome::Fail(TransformError::Failed(format!(
                        "campo {} não é inteiro: {:?}",
                        i, field
                    )))
                }
            }
        }
        row.push(sum.to_string());
        Outcome::Emit(row)
    }
}

/// Converte uma linha JSON em linha CSV escolhendo campos por nome
///
/// Campos ausentes viram string vazia; strings saem sem aspas JSON.
#[derive(Debug, Clone)]
pub struct JsonFieldsTransform {
    fields: Vec<String>,
}

impl JsonFieldsTransform {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowTransform<Vec<u8>, Row> for JsonFieldsTransform {
    fn apply(&self, payload: Vec<u8>) -> Outcome<Row> {
        let object: serde_json::Map<String, serde_json::Value> = match serde_json::from_slice(&payload) {
            Ok(object) => object,
            Err(err) => return Outcome::Fail(TransformError::failed(err)),
        };

        let row = self
            .fields
            .iter()
            .map(|field| match object.get(field) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        Outcome::Emit(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_map_transform_always_emits() {
        let transform = MapTransform::new(|r: Row| r.into_iter().rev().collect::<Row>());
        assert_eq!(transform.apply(row(&["a", "b"])), Outcome::Emit(row(&["b", "a"])));
    }

    #[test]
    fn test_filter_map_none_is_drop() {
        let transform = FilterMapTransform::new(|r: Row| if r[0] == "keep" { Some(r) } else { None });
        assert!(transform.apply(row(&["drop"])).is_drop());
        assert_eq!(transform.apply(row(&["keep"])), Outcome::Emit(row(&["keep"])));
    }

    #[test]
    fn test_try_map_error_becomes_failure() {
        let transform = TryMapTransform::new(|r: Row| r[0].parse::<i64>().map(|v| vec![v.to_string()]));
        assert!(matches!(transform.apply(row(&["x"])), Outcome::Fail(TransformError::Failed(_))));
        assert_eq!(transform.apply(row(&["5"])), Outcome::Emit(row(&["5"])));
    }

    #[test]
    fn test_apply_guarded_converts_panic() {
        let transform = MapTransform::new(|_: Row| -> Row { panic!("linha inválida") });
        match apply_guarded(&transform, row(&["a"])) {
            Outcome::Fail(TransformError::Panicked(message)) => assert_eq!(message, "linha inválida"),
            other => panic!("esperava pânico convertido, veio {:?}", other),
        }
    }

    #[test]
    fn test_append_sum() {
        assert_eq!(
            AppendSumTransform.apply(row(&["100", "32", "-3"])),
            Outcome::Emit(row(&["100", "32", "-3", "129"]))
        );
        assert!(matches!(AppendSumTransform.apply(row(&["a", "b", "c"])), Outcome::Fail(_)));
    }

    #[test]
    fn test_json_fields_transform() {
        let transform = JsonFieldsTransform::new(["title", "year", "missing"]);
        let payload = br#"{"title": "Akka in Action", "year": 2016}"#.to_vec();
        assert_eq!(
            transform.apply(payload),
            Outcome::Emit(row(&["Akka in Action", "2016", ""]))
        );
        assert!(matches!(transform.apply(b"{\"title\":".to_vec()), Outcome::Fail(_)));
    }
}
