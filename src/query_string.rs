use crate::params::{ParamValue, Params};
use url::form_urlencoded::byte_serialize;

/// URL에 값마다 반복해서 붙여야 하는 파라미터
/// <br>
/// https://solr.apache.org/guide/solr/latest/query-guide/common-query-parameters.html
pub const REPEATED_PARAMS: [&str; 3] = ["fq", "facet.field", "boost"];

/// 파라미터를 &name=value 형식의 query string으로 변환.
/// <br>
/// 첫 파라미터(?wt=json 등)는 호출하는 쪽에서 붙임
pub fn encode(params: &Params) -> String {
    let mut query_string = String::new();

    // 반복 파라미터를 먼저 처리
    for name in REPEATED_PARAMS {
        if let Some(ParamValue::List(values)) = params.get(name) {
            for value in values {
                push_pair(&mut query_string, name, &encode_value(value));
            }
        }
    }

    for (name, value) in params.iter() {
        match value {
            ParamValue::List(_) if REPEATED_PARAMS.contains(&name) => continue,
            ParamValue::List(values) => {
                let separator = if name == "qf" { "+" } else { "," };
                let joined = values
                    .iter()
                    .map(|v| encode_value(v))
                    .collect::<Vec<_>>()
                    .join(separator);
                push_pair(&mut query_string, name, &joined);
            }
            ParamValue::Bool(b) => {
                push_pair(&mut query_string, name, if *b { "true" } else { "false" })
            }
            scalar => push_pair(&mut query_string, name, &encode_value(&scalar.render())),
        }
    }

    query_string
}

/// application/x-www-form-urlencoded 규칙으로 인코딩. 공백은 +
pub fn encode_value(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

fn push_pair(query_string: &mut String, name: &str, encoded_value: &str) {
    query_string.push('&');
    query_string.push_str(&encode_value(name));
    query_string.push('=');
    query_string.push_str(encoded_value);
}

#[test]
fn repeated_fq_test() {
    let params = Params::new().fq("a:1").fq("b:2");
    assert_eq!(encode(&params), "&fq=a%3A1&fq=b%3A2");
}

#[test]
fn repeated_params_extracted_first_test() {
    let params = Params::new()
        .q("rust lang")
        .boost("recip(ms(NOW,date),3.16e-11,1,1)")
        .facet_field("author")
        .facet_field("year")
        .fq("type:book")
        .set("rows", 10);

    assert_eq!(
        encode(&params),
        "&fq=type%3Abook&facet.field=author&facet.field=year\
         &boost=recip%28ms%28NOW%2Cdate%29%2C3.16e-11%2C1%2C1%29&q=rust+lang&rows=10"
    );
}

#[test]
fn bool_is_lowercase_test() {
    let params = Params::new().set("active", false).set("facet", true);
    assert_eq!(encode(&params), "&active=false&facet=true");
}

#[test]
fn list_separator_test() {
    let params = Params::new()
        .set("qf", vec!["title^2", "body"])
        .set("fl", vec!["id", "title", "score"]);
    assert_eq!(encode(&params), "&qf=title%5E2+body&fl=id,title,score");
}

#[test]
fn empty_repeated_list_test() {
    let params = Params::new()
        .set("fq", Vec::<String>::new())
        .set("fl", Vec::<String>::new())
        .set("start", 0);
    assert_eq!(encode(&params), "&fl=&start=0");
}

#[test]
fn scalar_fq_keeps_position_test() {
    let params = Params::new().set("rows", 1).set("fq", "x:y");
    assert_eq!(encode(&params), "&rows=1&fq=x%3Ay");
}

#[test]
fn encode_unicode_value_test() {
    assert_eq!(encode_value("솔라 검색"), "%EC%86%94%EB%9D%BC+%EA%B2%80%EC%83%89");
    assert_eq!(encode_value("a&b=c"), "a%26b%3Dc");
}
