//! Streaming parser for JaCoCo XML reports carrying report metadata.
//!
//! Structure consumed here:
//!   <report name="...">
//!     <properties>
//!       <property name="moduleName" value="app"/>
//!       <property name="variantName" value="debug"/>
//!       <property name="testSuiteName" value="UnitTest"/>
//!     </properties>
//!     <sources><file path="src/main/java"/></sources>
//!     <package name="com/example">
//!       <class name="com/example/Foo" sourcefilename="Foo.java">
//!         <method name="doStuff" desc="()V" line="10">
//!           <counter type="INSTRUCTION" missed="0" covered="5"/>
//!         </method>
//!         <counter type="INSTRUCTION" missed="2" covered="10"/>
//!       </class>
//!       <sourcefile name="Foo.java">
//!         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
//!         <counter type="LINE" missed="1" covered="5"/>
//!       </sourcefile>
//!       <counter type="INSTRUCTION" missed="2" covered="10"/>
//!     </package>
//!     <counter type="INSTRUCTION" missed="2" covered="10"/>
//!   </report>
//!
//! Counters are attributed to their direct parent element only; counters
//! nested in `<method>` or `<group>` elements are not used. `<package>`
//! elements are collected wherever they appear, so grouped reports flatten.
//! Only the first `<properties>` and `<sources>` elements are read.
use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};

use super::{get_attr, xml_err, xml_reader};
use crate::counter::{parse_count, RawCounter};
use crate::error::{ReportError, Result};

/// One parsed report file, before it is folded into the aggregation state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JacocoDocument {
    pub properties: Vec<(String, String)>,
    pub source_roots: Vec<String>,
    pub counters: Vec<RawCounter>,
    pub packages: Vec<PackageElement>,
}

impl JacocoDocument {
    /// Value of the first property named `key`.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageElement {
    /// Raw `/`-separated name as written in the report.
    pub name: String,
    pub counters: Vec<RawCounter>,
    pub classes: Vec<ClassElement>,
    pub source_files: Vec<SourceFileElement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassElement {
    /// Raw `/`-separated binary name, e.g. `com/example/Foo$Inner`.
    pub name: String,
    pub source_file_name: String,
    pub counters: Vec<RawCounter>,
    pub methods: Vec<MethodElement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodElement {
    pub name: String,
    pub desc: String,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFileElement {
    pub name: String,
    pub counters: Vec<RawCounter>,
    pub lines: Vec<LineElement>,
}

/// `<line nr mi ci mb cb/>`: missed/covered instructions and branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineElement {
    pub nr: u32,
    pub mi: u64,
    pub ci: u64,
    pub mb: u64,
    pub cb: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Report,
    Properties,
    Sources,
    Package,
    Class,
    Method,
    SourceFile,
    Other,
}

impl Node {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"report" => Node::Report,
            b"properties" => Node::Properties,
            b"sources" => Node::Sources,
            b"package" => Node::Package,
            b"class" => Node::Class,
            b"method" => Node::Method,
            b"sourcefile" => Node::SourceFile,
            _ => Node::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    NotSeen,
    Open,
    Done,
}

#[derive(Default)]
struct ParseState {
    doc: JacocoDocument,
    stack: Vec<Node>,
    properties: Option<Section>,
    sources: Option<Section>,
    package: Option<PackageElement>,
    class: Option<ClassElement>,
    source_file: Option<SourceFileElement>,
    seen_root: bool,
}

impl ParseState {
    fn section(slot: Option<Section>) -> Section {
        slot.unwrap_or(Section::NotSeen)
    }

    fn open(&mut self, e: &BytesStart, is_empty: bool) {
        self.seen_root = true;
        let node = Node::from_name(e.name().as_ref());
        match e.name().as_ref() {
            b"properties" if Self::section(self.properties) == Section::NotSeen => {
                self.properties = Some(if is_empty { Section::Done } else { Section::Open });
            }
            b"property" if Self::section(self.properties) == Section::Open => {
                if let Some(name) = get_attr(e, b"name") {
                    let value = get_attr(e, b"value").unwrap_or_default();
                    self.doc.properties.push((name, value));
                }
            }
            b"sources" if Self::section(self.sources) == Section::NotSeen => {
                self.sources = Some(if is_empty { Section::Done } else { Section::Open });
            }
            b"file" if Self::section(self.sources) == Section::Open => {
                if let Some(path) = get_attr(e, b"path") {
                    self.doc.source_roots.push(path);
                }
            }
            b"package" => {
                self.finish_package();
                self.package = Some(PackageElement {
                    name: get_attr(e, b"name").unwrap_or_default(),
                    ..Default::default()
                });
            }
            b"class" if self.package.is_some() => {
                self.class = Some(ClassElement {
                    name: get_attr(e, b"name").unwrap_or_default(),
                    source_file_name: get_attr(e, b"sourcefilename").unwrap_or_default(),
                    ..Default::default()
                });
            }
            b"method" => {
                if let Some(class) = self.class.as_mut() {
                    class.methods.push(MethodElement {
                        name: get_attr(e, b"name").unwrap_or_default(),
                        desc: get_attr(e, b"desc").unwrap_or_default(),
                        line: u32::try_from(parse_count(get_attr(e, b"line").as_deref())).unwrap_or(0),
                    });
                }
            }
            b"sourcefile" if self.package.is_some() => {
                self.source_file = Some(SourceFileElement {
                    name: get_attr(e, b"name").unwrap_or_default(),
                    ..Default::default()
                });
            }
            b"line" => {
                if let Some(file) = self.source_file.as_mut() {
                    if let Some(line) = line_from(e) {
                        file.lines.push(line);
                    }
                }
            }
            b"counter" => self.counter(e),
            _ => {}
        }

        if is_empty {
            self.close(node);
        } else {
            self.stack.push(node);
        }
    }

    fn counter(&mut self, e: &BytesStart) {
        let Some(counter_type) = get_attr(e, b"type") else {
            return;
        };
        let counter = RawCounter::from_attrs(
            &counter_type,
            get_attr(e, b"missed").as_deref(),
            get_attr(e, b"covered").as_deref(),
        );
        let target = match self.stack.last() {
            Some(Node::Report) => Some(&mut self.doc.counters),
            Some(Node::Package) => self.package.as_mut().map(|p| &mut p.counters),
            Some(Node::Class) => self.class.as_mut().map(|c| &mut c.counters),
            Some(Node::SourceFile) => self.source_file.as_mut().map(|f| &mut f.counters),
            _ => None,
        };
        if let Some(counters) = target {
            counters.push(counter);
        }
    }

    fn close(&mut self, node: Node) {
        match node {
            Node::Properties if self.properties == Some(Section::Open) => {
                self.properties = Some(Section::Done);
            }
            Node::Sources if self.sources == Some(Section::Open) => {
                self.sources = Some(Section::Done);
            }
            Node::Class => {
                if let (Some(class), Some(package)) = (self.class.take(), self.package.as_mut()) {
                    package.classes.push(class);
                }
            }
            Node::SourceFile => {
                if let (Some(file), Some(package)) = (self.source_file.take(), self.package.as_mut()) {
                    package.source_files.push(file);
                }
            }
            Node::Package => self.finish_package(),
            _ => {}
        }
    }

    fn finish_package(&mut self) {
        if let Some(package) = self.package.take() {
            self.doc.packages.push(package);
        }
    }
}

fn line_from(e: &BytesStart) -> Option<LineElement> {
    let mut line = LineElement::default();
    let mut nr = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok();
        let value = value.as_deref();
        match attr.key.as_ref() {
            b"nr" => nr = value.and_then(|v| v.trim().parse::<u32>().ok()),
            b"mi" => line.mi = parse_count(value),
            b"ci" => line.ci = parse_count(value),
            b"mb" => line.mb = parse_count(value),
            b"cb" => line.cb = parse_count(value),
            _ => {}
        }
    }
    line.nr = nr?;
    Some(line)
}

/// Parse JaCoCo XML from raw bytes.
pub fn parse(input: &[u8]) -> Result<JacocoDocument> {
    parse_reader(input)
}

/// Parse JaCoCo XML from any buffered reader. Malformed XML is an error;
/// there is no partial-document recovery.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<JacocoDocument> {
    let mut xml = xml_reader(reader);
    let mut buf = Vec::new();
    let mut state = ParseState::default();

    loop {
        match xml.read_event_into(&mut buf) {
            Err(e) => return Err(xml_err(e, &xml)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) => state.open(e, false),
            Ok(Event::Empty(ref e)) => state.open(e, true),
            Ok(Event::End(_)) => {
                let node = state.stack.pop().ok_or_else(|| {
                    ReportError::Parse(format!(
                        "unexpected closing tag at position {}",
                        xml.buffer_position()
                    ))
                })?;
                state.close(node);
            }
            // DOCTYPE, comments, processing instructions and text carry
            // nothing the report needs.
            Ok(_) => {}
        }
        buf.clear();
    }

    if !state.seen_root {
        return Err(ReportError::Parse("document has no root element".to_string()));
    }
    if !state.stack.is_empty() {
        return Err(ReportError::Parse(format!(
            "unexpected end of document with {} unclosed element(s)",
            state.stack.len()
        )));
    }
    Ok(state.doc)
}
