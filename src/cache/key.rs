//! Geração de chaves de cache a partir dos argumentos de uma chamada.
//!
//! Formato da chave: `args: <posicionais>, kwargs: <json>`.
//!
//! - Argumentos posicionais usam a representação `Debug` de cada valor,
//!   na ordem da chamada, separados por `", "`.
//! - Argumentos nomeados são serializados como um objeto JSON com as chaves
//!   ordenadas (em todos os níveis), então a ordem em que foram informados
//!   não altera a chave.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{WrappyError, WrappyResult};

/// Renderiza argumentos de chamada em chaves de cache canônicas.
pub struct KeyCodec;

impl KeyCodec {
    /// Gera a chave para argumentos posicionais e nomeados.
    ///
    /// `named` deve serializar para um objeto JSON (struct ou mapa), ou para
    /// `null` (`()` ou `None`) quando não há argumentos nomeados.
    ///
    /// # Erros
    /// `WrappyError::Serialization` se `named` não puder ser serializado
    /// (ex.: mapa com chaves não-string) ou não for um objeto.
    pub fn render<N: Serialize + ?Sized>(
        positional: &[&dyn Debug],
        named: &N,
    ) -> WrappyResult<String> {
        let kwargs = Self::named_form(named)?;
        Ok(format!(
            "args: {}, kwargs: {}",
            Self::positional_form(positional),
            kwargs
        ))
    }

    /// Gera a chave de uma chamada sem argumentos nomeados.
    pub fn render_positional(positional: &[&dyn Debug]) -> String {
        format!("args: {}, kwargs: {{}}", Self::positional_form(positional))
    }

    fn positional_form(positional: &[&dyn Debug]) -> String {
        positional
            .iter()
            .map(|arg| format!("{:?}", arg))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn named_form<N: Serialize + ?Sized>(named: &N) -> WrappyResult<String> {
        let value = serde_json::to_value(named)
            .map_err(|e| WrappyError::serialization(e.to_string()))?;

        match value {
            Value::Null => Ok("{}".to_string()),
            Value::Object(map) => serde_json::to_string(&sorted(Value::Object(map)))
                .map_err(|e| WrappyError::serialization(e.to_string())),
            other => Err(WrappyError::serialization(format!(
                "named arguments must serialize to an object, got {}",
                kind(&other)
            ))),
        }
    }
}

/// Reconstrói objetos com as chaves em ordem, independente da implementação de `Map`.
fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));

            let mut ordered = Map::new();
            for (k, v) in entries {
                ordered.insert(k, sorted(v));
            }
            Value::Object(ordered)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Argumentos nomeados montados em tempo de execução.
///
/// ```
/// use wrappy::cache::{KeyCodec, NamedArgs};
///
/// let named = NamedArgs::new().with("base", &10).unwrap().with("exact", &true).unwrap();
/// let key = KeyCodec::render(&[&"42"], &named).unwrap();
/// assert_eq!(key, r#"args: "42", kwargs: {"base":10,"exact":true}"#);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamedArgs(BTreeMap<String, Value>);

impl NamedArgs {
    /// Cria um conjunto vazio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adiciona um argumento nomeado.
    pub fn with<T: Serialize + ?Sized>(mut self, name: &str, value: &T) -> WrappyResult<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| WrappyError::serialization(format!("argument '{}': {}", name, e)))?;
        self.0.insert(name.to_string(), value);
        Ok(self)
    }

    /// Número de argumentos.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Verifica se não há argumentos.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Serialize)]
    struct Options {
        verbose: bool,
        depth: u32,
    }

    #[test]
    fn test_positional_only() {
        let key = KeyCodec::render_positional(&[&1, &"two", &vec![3, 4]]);
        assert_eq!(key, r#"args: 1, "two", [3, 4], kwargs: {}"#);
    }

    #[test]
    fn test_render_with_unit_named_matches_positional() {
        let a = KeyCodec::render(&[&7u64], &()).unwrap();
        let b = KeyCodec::render_positional(&[&7u64]);
        assert_eq!(a, b);
        assert_eq!(a, "args: 7, kwargs: {}");
    }

    #[test]
    fn test_empty_call() {
        assert_eq!(KeyCodec::render_positional(&[]), "args: , kwargs: {}");
    }

    #[test]
    fn test_named_order_does_not_matter() {
        let mut first = HashMap::new();
        first.insert("zeta", 1);
        first.insert("alpha", 2);
        first.insert("mid", 3);

        let mut second = HashMap::new();
        second.insert("mid", 3);
        second.insert("alpha", 2);
        second.insert("zeta", 1);

        let k1 = KeyCodec::render(&[], &first).unwrap();
        let k2 = KeyCodec::render(&[], &second).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(k1, r#"args: , kwargs: {"alpha":2,"mid":3,"zeta":1}"#);
    }

    #[test]
    fn test_struct_fields_are_sorted() {
        let key = KeyCodec::render(&[&"x"], &Options { verbose: true, depth: 2 }).unwrap();
        assert_eq!(key, r#"args: "x", kwargs: {"depth":2,"verbose":true}"#);
    }

    #[test]
    fn test_nested_objects_are_sorted() {
        let named = NamedArgs::new()
            .with("opts", &Options { verbose: false, depth: 1 })
            .unwrap();
        let key = KeyCodec::render(&[], &named).unwrap();
        assert_eq!(key, r#"args: , kwargs: {"opts":{"depth":1,"verbose":false}}"#);
    }

    #[test]
    fn test_distinct_values_give_distinct_keys() {
        // String "1" e inteiro 1 não colidem
        let k1 = KeyCodec::render_positional(&[&"1"]);
        let k2 = KeyCodec::render_positional(&[&1]);
        assert_ne!(k1, k2);

        // Argumento posicional vs nomeado
        let k3 = KeyCodec::render(&[], &NamedArgs::new().with("n", &1).unwrap()).unwrap();
        assert_ne!(k2, k3);
    }

    #[test]
    fn test_non_ascii_kept_verbatim() {
        let named = NamedArgs::new().with("nome", "ação").unwrap();
        let key = KeyCodec::render(&[], &named).unwrap();
        assert_eq!(key, r#"args: , kwargs: {"nome":"ação"}"#);
    }

    #[test]
    fn test_non_string_map_keys_fail() {
        let mut named = HashMap::new();
        named.insert((1u8, 2u8), "pair");

        let err = KeyCodec::render(&[], &named).unwrap_err();
        assert!(matches!(err, WrappyError::Serialization(_)));
    }

    #[test]
    fn test_named_must_be_object() {
        let err = KeyCodec::render(&[], &vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, WrappyError::Serialization(_)));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_named_args_builder_rejects_bad_value() {
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 0);

        let result = NamedArgs::new().with("bad", &bad);
        assert!(matches!(result, Err(WrappyError::Serialization(_))));
    }

    #[test]
    fn test_named_args_len() {
        let named = NamedArgs::new().with("a", &1).unwrap().with("a", &2).unwrap();
        assert_eq!(named.len(), 1);
        assert!(!named.is_empty());
        assert!(NamedArgs::new().is_empty());
    }
}
