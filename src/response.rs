use serde_json::{Map, Value};

/// Solr 문서. 필드명 -> 값 (필드 순서 유지)
pub type Document = Map<String, Value>;

/// Solr JSON 응답을 정규화한 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// 파싱된 응답 원문
    pub raw: Value,
    pub status: u16,
    /// get 핸들러의 단일 문서. 없으면 빈 map
    pub doc: Document,
    pub docs: Vec<Document>,
    /// 첫 번째 원본 문서에 대한 more like this 결과만 담음
    pub more_like_this: Vec<Document>,
    pub spelling_suggestions: Vec<Value>,
}

/// facet_counts.facet_fields 의 term 별 건수
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

impl Response {
    pub fn from_body(status: u16, body: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(body)?, status))
    }

    pub fn new(raw: Value, status: u16) -> Self {
        let doc = raw
            .get("doc")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let docs = raw
            .pointer("/response/docs")
            .map(collect_docs)
            .unwrap_or_default();

        // moreLikeThis는 원본 문서 id 별로 묶여 있음. 첫 번째 묶음만 사용
        let more_like_this = raw
            .get("moreLikeThis")
            .and_then(Value::as_object)
            .and_then(|mlt| mlt.values().next())
            .and_then(|group| group.get("docs"))
            .map(collect_docs)
            .unwrap_or_default();

        let spelling_suggestions = raw
            .get("spellcheck")
            .map(spelling_suggestions)
            .unwrap_or_default();

        Self {
            raw,
            status,
            doc,
            docs,
            more_like_this,
            spelling_suggestions,
        }
    }

    /// 응답 원문의 최상위 필드
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub fn num_found(&self) -> Option<u64> {
        self.raw.pointer("/response/numFound").and_then(Value::as_u64)
    }

    /// facet.field 결과.
    /// <br>
    /// Solr 기본 응답 형식(json.nl=flat)인 [term, count, term, count, ...] 과 map 형식 모두 처리
    pub fn facet_fields(&self) -> Vec<(String, Vec<FacetCount>)> {
        let Some(fields) = self
            .raw
            .pointer("/facet_counts/facet_fields")
            .and_then(Value::as_object)
        else {
            return Vec::new();
        };

        fields
            .iter()
            .map(|(name, counts)| (name.clone(), facet_counts(counts)))
            .collect()
    }
}

fn collect_docs(docs: &Value) -> Vec<Document> {
    docs.as_array()
        .map(|docs| docs.iter().filter_map(Value::as_object).cloned().collect())
        .unwrap_or_default()
}

fn spelling_suggestions(spellcheck: &Value) -> Vec<Value> {
    let mut suggestions: Vec<Value> = Vec::new();

    // collations는 첫 번째 원소가 "collations" 문자열임
    if let Some(collations) = spellcheck.get("collations").and_then(Value::as_array) {
        if collations.len() > 1 {
            suggestions.push(collations[1].clone());
        }
    }

    // 원본 검색어, 추천 목록 순서로 번갈아 나옴. 추천 목록(map)만 사용
    if let Some(entries) = spellcheck.get("suggestions").and_then(Value::as_array) {
        for entry in entries {
            let Some(items) = entry.get("suggestion").and_then(Value::as_array) else {
                continue;
            };
            for item in items {
                if !suggestions.contains(item) {
                    suggestions.push(item.clone());
                }
            }
        }
    }

    suggestions
}

fn facet_counts(counts: &Value) -> Vec<FacetCount> {
    match counts {
        Value::Array(flat) => flat
            .chunks_exact(2)
            .filter_map(|pair| {
                Some(FacetCount {
                    value: pair[0].as_str()?.to_string(),
                    count: pair[1].as_u64()?,
                })
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(value, count)| {
                Some(FacetCount {
                    value: value.clone(),
                    count: count.as_u64()?,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
use pretty_assertions::assert_eq;
#[cfg(test)]
use serde_json::json;

#[test]
fn docs_response_test() {
    let response = Response::new(json!({"response": {"numFound": 1, "docs": [{"id": "1"}]}}), 200);

    assert_eq!(response.docs.len(), 1);
    assert_eq!(response.docs[0].get("id"), Some(&json!("1")));
    assert!(response.doc.is_empty());
    assert!(response.more_like_this.is_empty());
    assert!(response.spelling_suggestions.is_empty());
    assert_eq!(response.num_found(), Some(1));
    assert_eq!(response.status, 200);
}

#[test]
fn single_doc_response_test() {
    let response = Response::from_body(200, r#"{"doc": {"id": "abc", "title": "Rust"}}"#).unwrap();
    assert_eq!(response.doc.get("title"), Some(&json!("Rust")));
    assert!(response.docs.is_empty());

    // doc이 null인 경우 (없는 id)
    let response = Response::from_body(200, r#"{"doc": null}"#).unwrap();
    assert!(response.doc.is_empty());
}

#[test]
fn collations_test() {
    let response = Response::new(
        json!({"spellcheck": {"collations": ["collations", "alt query"]}}),
        200,
    );
    assert_eq!(response.spelling_suggestions, vec![json!("alt query")]);

    // "collations" 한 개만 있는 경우는 무시
    let response = Response::new(json!({"spellcheck": {"collations": ["collations"]}}), 200);
    assert!(response.spelling_suggestions.is_empty());
}

#[test]
fn spellcheck_suggestions_dedup_test() {
    let response = Response::new(
        json!({"spellcheck": {
            "suggestions": [
                "jav",
                {"numFound": 2, "suggestion": ["java", "javascript"]},
                "rsut",
                {"numFound": 2, "suggestion": ["rust", "java"]}
            ],
            "collations": ["collations", "java"]
        }}),
        200,
    );

    assert_eq!(
        response.spelling_suggestions,
        vec![json!("java"), json!("javascript"), json!("rust")]
    );
}

#[test]
fn more_like_this_first_group_test() {
    let response = Response::from_body(
        200,
        r#"{
            "response": {"docs": [{"id": "a"}]},
            "moreLikeThis": {
                "a": {"numFound": 2, "docs": [{"id": "b"}, {"id": "c"}]},
                "z": {"numFound": 1, "docs": [{"id": "y"}]}
            }
        }"#,
    )
    .unwrap();

    let ids: Vec<&Value> = response
        .more_like_this
        .iter()
        .filter_map(|doc| doc.get("id"))
        .collect();
    assert_eq!(ids, vec![&json!("b"), &json!("c")]);
}

#[test]
fn facet_fields_test() {
    let response = Response::new(
        json!({"facet_counts": {"facet_fields": {
            "author": ["kim", 3, "lee", 1],
            "year": {"2022": 5}
        }}}),
        200,
    );

    assert_eq!(
        response.facet_fields(),
        vec![
            (
                "author".to_string(),
                vec![
                    FacetCount { value: "kim".to_string(), count: 3 },
                    FacetCount { value: "lee".to_string(), count: 1 },
                ]
            ),
            ("year".to_string(), vec![FacetCount { value: "2022".to_string(), count: 5 }]),
        ]
    );
}

#[test]
fn non_object_payload_test() {
    let response = Response::from_body(200, "[1, 2, 3]").unwrap();
    assert!(response.docs.is_empty());
    assert!(response.doc.is_empty());
    assert!(Response::from_body(200, "not json").is_err());
}
