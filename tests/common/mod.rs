//! Shared test helpers for integration tests

use conformance_harness::{
    ExpressionHost, Gate, HarnessConfig, MemorySink, ObjectRef, Page, ReportStyle, Reporter,
    SuiteContext, Value,
};

/// A suite over a host with a few DOM-ish bindings
pub fn suite(name: &str) -> SuiteContext {
    suite_with_config(name, HarnessConfig::default())
}

pub fn suite_with_config(name: &str, config: HarnessConfig) -> SuiteContext {
    let mut host = ExpressionHost::new();
    let body = ObjectRef::new("HTMLBodyElement", [("tagName", Value::from("BODY")), ("nodeType", Value::from(1))]);
    host.define("title", "Conformance")
        .define_object("body", body);
    SuiteContext::with_config(name, host, config)
}

/// Reporter writing into a shared buffer the test can inspect
pub fn memory_reporter(style: ReportStyle) -> (Reporter, MemorySink) {
    let sink = MemorySink::new();
    (Reporter::new(sink.clone(), style), sink)
}

/// Reporter in the style the config names
#[allow(dead_code)]
pub fn configured_reporter(config: &HarnessConfig) -> (Reporter, MemorySink) {
    let sink = MemorySink::new();
    (Reporter::from_config(sink.clone(), config), sink)
}

/// A page gated on `required` signals, reporting WebKit-style into memory
#[allow(dead_code)]
pub fn page(name: &str, required: usize) -> (Page, MemorySink) {
    let config = HarnessConfig {
        report_style: ReportStyle::WebKit,
        ..HarnessConfig::default()
    };
    let sink = MemorySink::new();
    let page = Page::with_sink(suite_with_config(name, config), Gate::counted(required), sink.clone());
    (page, sink)
}
