use crate::response::Document;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::io::Cursor;

/// 문서 목록을 Solr XML update 형식(<add><doc><field name="..">..</field></doc></add>)으로 변환.
/// <br>
/// 배열 값은 같은 이름의 field를 반복해서 씀 (multiValued 필드). null은 생략
pub fn add_docs(docs: &[Document]) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new(Cursor::new(Vec::with_capacity(docs.len() * 256)));

    writer.write_event(Event::Start(BytesStart::new("add")))?;

    for doc in docs {
        writer.write_event(Event::Start(BytesStart::new("doc")))?;

        for (field_name, value) in doc {
            match value {
                Value::Array(values) => {
                    for value in values {
                        write_field(&mut writer, field_name, value)?;
                    }
                }
                value => write_field(&mut writer, field_name, value)?,
            }
        }

        writer.write_event(Event::End(BytesEnd::new("doc")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("add")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// id 목록 삭제 요청 (<delete><id>..</id></delete>)
pub fn delete_by_ids<S: AsRef<str>>(ids: &[S]) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Start(BytesStart::new("delete")))?;
    for id in ids {
        writer.write_event(Event::Start(BytesStart::new("id")))?;
        writer.write_event(Event::Text(BytesText::new(id.as_ref())))?;
        writer.write_event(Event::End(BytesEnd::new("id")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("delete")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_field(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    field_name: &str,
    value: &Value,
) -> Result<(), quick_xml::Error> {
    let text = match value {
        Value::Null => return Ok(()),
        Value::String(s) => s.clone(),
        // 중첩 객체는 JSON 문자열로 저장
        other => other.to_string(),
    };

    let mut field_event = BytesStart::new("field");
    field_event.push_attribute(("name", field_name));
    writer.write_event(Event::Start(field_event))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new("field")))?;

    Ok(())
}

#[test]
fn add_docs_test() {
    let docs: Vec<Document> = serde_json::from_str(
        r#"[
            {"id": "a77b3908fb67bd1b", "title": "삼성ENG, 2분기 영업이익 <1535억>", "tag": ["news", "economy"], "score": 10, "empty": null},
            {"id": "c0046e9c36e35a60", "url": "http://www.lenews.co.kr/news/articleView.html?idxno=90124&a=1"}
        ]"#,
    )
    .unwrap();

    let xml = add_docs(&docs).unwrap();
    assert_eq!(
        xml,
        "<add>\
         <doc>\
         <field name=\"id\">a77b3908fb67bd1b</field>\
         <field name=\"title\">삼성ENG, 2분기 영업이익 &lt;1535억&gt;</field>\
         <field name=\"tag\">news</field>\
         <field name=\"tag\">economy</field>\
         <field name=\"score\">10</field>\
         </doc>\
         <doc>\
         <field name=\"id\">c0046e9c36e35a60</field>\
         <field name=\"url\">http://www.lenews.co.kr/news/articleView.html?idxno=90124&amp;a=1</field>\
         </doc>\
         </add>"
    );
}

#[test]
fn empty_add_docs_test() {
    assert_eq!(add_docs(&[]).unwrap(), "<add></add>");
}

#[test]
fn delete_by_ids_test() {
    assert_eq!(
        delete_by_ids(&["1", "a&b"]).unwrap(),
        "<delete><id>1</id><id>a&amp;b</id></delete>"
    );
}
