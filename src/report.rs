use serde_json::json;
use serde_sarif::sarif::{
    Artifact, Invocation, Location, LogicalLocation, Message, Result as SarifResult, Run, Sarif,
    Tool, ToolComponent, SCHEMA_URL,
};

use crate::ir::{CallSite, MethodInfo};
use crate::replacer::{RewriteKind, RewriteRecord};
use crate::weave::WovenClass;

pub(crate) const TOOL_NAME: &str = "callweave";

pub(crate) fn rule_id(kind: RewriteKind) -> &'static str {
    match kind {
        RewriteKind::Invocation => "INVOKE_REPLACED",
        RewriteKind::Construction => "CONSTRUCTION_REPLACED",
        RewriteKind::SuperConstructor => "SUPER_CONSTRUCTOR_REDIRECTED",
    }
}

/// One result per rewritten site, in class and program order.
pub(crate) fn rewrite_results(woven: &[WovenClass]) -> Vec<SarifResult> {
    let mut results = Vec::new();
    for class in woven {
        for method in &class.rewrites {
            for record in &method.records {
                results.push(rewrite_result(&method.method, record));
            }
        }
    }
    results
}

fn rewrite_result(method: &MethodInfo, record: &RewriteRecord) -> SarifResult {
    let message = result_message(format!(
        "{} {} replaced with {}",
        record.original.kind.mnemonic(),
        describe(&record.original),
        describe(&record.replacement)
    ));
    let location = method_location(&method.class_name, &method.method_name, &method.descriptor);
    SarifResult::builder()
        .rule_id(rule_id(record.kind))
        .message(message)
        .locations(vec![location])
        .build()
}

fn describe(site: &CallSite) -> String {
    format!("{}.{}{}", site.owner, site.name, site.descriptor)
}

pub(crate) fn method_location(class_name: &str, method_name: &str, descriptor: &str) -> Location {
    let logical = LogicalLocation::builder()
        .name(format!("{class_name}.{method_name}{descriptor}"))
        .kind("function")
        .build();
    Location::builder().logical_locations(vec![logical]).build()
}

pub(crate) fn result_message(text: impl Into<String>) -> Message {
    Message::builder().text(text.into()).build()
}

pub(crate) fn build_invocation() -> Invocation {
    let arguments: Vec<String> = std::env::args().collect();
    let command_line = arguments.join(" ");

    Invocation::builder()
        .execution_successful(true)
        .arguments(arguments)
        .command_line(command_line)
        .build()
}

pub(crate) fn build_sarif(
    artifacts: Vec<Artifact>,
    invocation: Invocation,
    results: Vec<SarifResult>,
) -> Sarif {
    let driver = ToolComponent::builder().name(TOOL_NAME).build();
    let tool = Tool {
        driver,
        extensions: None,
        properties: None,
    };
    let run = if artifacts.is_empty() {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .build()
    } else {
        Run::builder()
            .tool(tool)
            .invocations(vec![invocation])
            .results(results)
            .artifacts(artifacts)
            .build()
    };

    Sarif::builder()
        .schema(SCHEMA_URL)
        .runs(vec![run])
        .version(json!("2.1.0"))
        .build()
}
