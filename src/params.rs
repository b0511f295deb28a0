use serde_json::{Map, Number, Value};
use smallvec::SmallVec;

/// 다중값 파라미터. 대부분 1~4개라 inline으로 보관
pub type ParamList = SmallVec<[String; 4]>;

/// Solr 파라미터 값
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(ParamList),
}

impl ParamValue {
    /// 단일값을 문자열로 변환. bool은 반드시 소문자 (Solr는 True/False를 거부함)
    pub fn render(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Bool(true) => "true".to_string(),
            ParamValue::Bool(false) => "false".to_string(),
            ParamValue::List(values) => values.join(","),
        }
    }

    /// Solr의 boolean 해석 규칙을 따름
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Bool(b) => *b,
            ParamValue::Int(i) => *i != 0,
            ParamValue::Float(f) => *f != 0.0,
            ParamValue::Str(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "on" | "yes"
            ),
            ParamValue::List(values) => !values.is_empty(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::Int(i) => Value::Number((*i).into()),
            ParamValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::List(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        ParamValue::List(value.into_iter().collect())
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        ParamValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(value: [&str; N]) -> Self {
        ParamValue::List(value.into_iter().map(str::to_string).collect())
    }
}

/// 요청 파라미터.
/// <br>
/// Solr로 전달되는 파라미터는 입력 순서를 유지하는 entries에 보관하고,
/// Solr로 전달되지 않는 클라이언트 옵션(collection, handler 등)은 별도 필드로 보관
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
    collection: Option<String>,
    handler: Option<String>,
    prefer_local: bool,
    spellcheck_dicts: Option<ParamList>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파라미터 설정. 이미 있는 경우 기존 위치에서 값만 교체
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, old)) => *old = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 다중값 파라미터에 값을 추가. 기존 값이 단일값이면 리스트로 변환
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, ParamValue::List(values))) => values.push(value),
            Some((_, old)) => {
                let mut values = ParamList::new();
                values.push(old.render());
                values.push(value);
                *old = ParamValue::List(values);
            }
            None => {
                let mut values = ParamList::new();
                values.push(value);
                self.entries.push((name, ParamValue::List(values)));
            }
        }
    }

    pub fn q(self, q: impl Into<String>) -> Self {
        self.set("q", q.into())
    }

    /// filter query. URL에서는 값마다 &fq=가 반복됨
    pub fn fq(mut self, fq: impl Into<String>) -> Self {
        self.push("fq", fq);
        self
    }

    pub fn facet_field(mut self, field: impl Into<String>) -> Self {
        self.push("facet.field", field);
        self
    }

    pub fn boost(mut self, boost: impl Into<String>) -> Self {
        self.push("boost", boost);
        self
    }

    /// query fields. URL에서는 +로 이어붙임
    pub fn qf(mut self, field: impl Into<String>) -> Self {
        self.push("qf", field);
        self
    }

    /// 클라이언트 기본 collection 대신 사용할 collection
    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn handler(mut self, handler: impl Into<String>) -> Self {
        self.handler = Some(handler.into());
        self
    }

    /// shards.preference=replica.location:local 을 URL에 붙임
    pub fn prefer_local(mut self, prefer_local: bool) -> Self {
        self.prefer_local = prefer_local;
        self
    }

    /// spellcheck 사용 시 spellcheck.dictionary로 전달
    pub fn spellcheck_dicts<I, S>(mut self, dicts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spellcheck_dicts = Some(dicts.into_iter().map(Into::into).collect());
        self
    }

    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn handler_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.handler.as_deref().unwrap_or(default)
    }

    pub fn is_prefer_local(&self) -> bool {
        self.prefer_local
    }

    pub fn take_spellcheck_dicts(&mut self) -> Option<ParamList> {
        self.spellcheck_dicts.take()
    }

    /// JSON Request API의 params 객체. 입력 순서 유지
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

#[test]
fn params_keep_insertion_order_test() {
    let params = Params::new()
        .set("rows", 10)
        .set("q", "title:rust")
        .set("start", 0)
        .set("rows", 20);

    let names: Vec<&str> = params.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["rows", "q", "start"]);
    assert_eq!(params.get("rows"), Some(&ParamValue::Int(20)));
}

#[test]
fn params_push_multi_value_test() {
    let params = Params::new()
        .set("fq", "type:book")
        .fq("lang:ko")
        .facet_field("author")
        .facet_field("year");

    assert_eq!(
        params.get("fq"),
        Some(&ParamValue::from(vec!["type:book", "lang:ko"]))
    );
    assert_eq!(
        params.get("facet.field"),
        Some(&ParamValue::from(["author", "year"]))
    );
}

#[test]
fn params_client_options_not_in_entries_test() {
    let mut params = Params::new()
        .collection("books")
        .handler("mlt")
        .prefer_local(true)
        .spellcheck_dicts(["default", "wordbreak"]);

    assert!(params.is_empty());
    assert_eq!(params.collection_name(), Some("books"));
    assert_eq!(params.handler_or("select"), "mlt");
    assert!(params.is_prefer_local());
    assert_eq!(params.take_spellcheck_dicts().unwrap().len(), 2);
    assert!(params.take_spellcheck_dicts().is_none());
}

#[test]
fn param_value_truthy_test() {
    assert!(ParamValue::from(true).is_truthy());
    assert!(ParamValue::from("on").is_truthy());
    assert!(ParamValue::from("TRUE").is_truthy());
    assert!(!ParamValue::from("false").is_truthy());
    assert!(!ParamValue::from(0).is_truthy());
    assert_eq!(ParamValue::from(false).render(), "false");
}

#[test]
fn params_to_json_test() {
    let params = Params::new()
        .q("*:*")
        .set("rows", 5)
        .set("debug", false)
        .fq("a:1");

    assert_eq!(
        params.to_json(),
        serde_json::json!({"q": "*:*", "rows": 5, "debug": false, "fq": ["a:1"]})
    );
}
