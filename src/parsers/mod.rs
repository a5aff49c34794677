pub mod jacoco;

use std::io::BufRead;

use quick_xml::events::BytesStart;
use quick_xml::reader::Reader;

use crate::error::ReportError;

/// Build an XML reader with the settings every parser shares.
///
/// quick-xml never fetches external DTDs and only expands the predefined
/// entities and character references, so DOCTYPE declarations in a report
/// are skipped without being resolved.
pub(crate) fn xml_reader<R: BufRead>(reader: R) -> Reader<R> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);
    xml
}

/// Wrap a quick-xml error with the reader's current byte offset.
pub(crate) fn xml_err<R>(source: quick_xml::Error, reader: &Reader<R>) -> ReportError {
    ReportError::Xml {
        source,
        position: reader.buffer_position(),
    }
}

/// Value of the attribute `name`, unescaped. Attributes that fail to
/// unescape (for example ones using undeclared entities) read as absent.
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}
