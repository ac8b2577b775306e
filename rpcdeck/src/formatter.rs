use colored::*;
use rpcdeck_core::{
    metadata::{MetadataEntry, ParseType},
    schema::{MethodStub, Service},
    session::{InboundData, RequestSession, ResponseSession},
    storage::ProtoRecord,
};
use std::fmt::Display;
use std::path::PathBuf;

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

pub struct ServiceList(pub Vec<Service>);

pub struct ProtoList(pub Vec<ProtoRecord>);

pub struct IncludeDirList(pub Vec<PathBuf>);

pub struct History<'a>(pub Option<&'a RequestSession>, pub Option<&'a ResponseSession>);

pub struct ParseTypeList;

pub struct GenericError<T: Display>(pub &'static str, pub T);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<&InboundData> for FormattedString {
    fn from(data: &InboundData) -> Self {
        let mut out = String::new();

        match &data.status {
            Some(status) => out.push_str(&format!(
                "{} code={} message='{}'",
                "gRPC Failed:".red().bold(),
                status.code,
                status.message
            )),
            None => out.push_str(&pretty(&data.body)),
        }

        if !data.metadata.is_empty() {
            out.push('\n');
            out.push_str(&metadata_lines(&data.metadata));
        }

        FormattedString(out)
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        FormattedString(format!("{}\n\n'{:#}'", "Error:".red().bold(), err))
    }
}

impl<T: Display> From<GenericError<T>> for FormattedString {
    fn from(GenericError(msg, err): GenericError<T>) -> Self {
        FormattedString(format!("{}:\n\n'{}'", msg.red().bold(), err))
    }
}

impl From<ServiceList> for FormattedString {
    fn from(ServiceList(services): ServiceList) -> Self {
        if services.is_empty() {
            return FormattedString("No services found.".yellow().to_string());
        }

        let mut out = String::new();
        for service in services {
            out.push_str(&format!("{} {} {{\n", "service".cyan(), service.id.green()));
            for method in &service.methods {
                out.push_str(&indent(&FormattedString::from(method).0, "  "));
                out.push_str("\n\n");
            }
            out.push_str("}\n\n");
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<&MethodStub> for FormattedString {
    fn from(method: &MethodStub) -> Self {
        FormattedString(format!(
            "{} {} ({})\n{}",
            "rpc".cyan(),
            method.name.green(),
            method.mode.label().yellow(),
            pretty(&method.request_body)
        ))
    }
}

impl From<ProtoList> for FormattedString {
    fn from(ProtoList(protos): ProtoList) -> Self {
        if protos.is_empty() {
            return FormattedString("No saved protos.".yellow().to_string());
        }

        let mut out = String::new();
        for proto in protos {
            let host = if proto.host.is_empty() {
                "no host".dimmed().to_string()
            } else {
                proto.host.clone()
            };
            out.push_str(&format!("{} {} [{}]\n", proto.name.green(), proto.path, host));
            for method in &proto.methods {
                out.push_str(&format!(
                    "  - {} ({})\n",
                    method.id.as_str(),
                    method.mode.label().yellow()
                ));
            }
        }
        FormattedString(out.trim_end().to_string())
    }
}

impl From<IncludeDirList> for FormattedString {
    fn from(IncludeDirList(dirs): IncludeDirList) -> Self {
        if dirs.is_empty() {
            return FormattedString("No include directories.".yellow().to_string());
        }

        let lines: Vec<_> = dirs
            .iter()
            .map(|dir| format!("  - {}", dir.display()))
            .collect();
        FormattedString(lines.join("\n"))
    }
}

impl From<History<'_>> for FormattedString {
    fn from(History(requests, responses): History<'_>) -> Self {
        let mut out = format!("{}\n", "Requests (most recent first):".cyan().bold());
        for body in requests.into_iter().flat_map(|r| r.streams()) {
            out.push_str(&indent(&pretty(body), "  "));
            out.push('\n');
        }

        out.push_str(&format!("{}\n", "Responses (most recent first):".cyan().bold()));
        if let Some(responses) = responses {
            for body in responses.streams() {
                out.push_str(&indent(&pretty(body), "  "));
                out.push('\n');
            }
            if !responses.metadata().is_empty() {
                out.push_str(&metadata_lines(responses.metadata()));
            }
        }

        FormattedString(out.trim_end().to_string())
    }
}

impl From<ParseTypeList> for FormattedString {
    fn from(_: ParseTypeList) -> Self {
        let lines: Vec<_> = ParseType::ALL
            .iter()
            .map(|t| {
                let width = t
                    .width()
                    .map(|w| format!("{w} bytes"))
                    .unwrap_or_else(|| "utf-8".to_string());
                format!("  {:>2}  {:<12} {}", t.code(), t.name().green(), width.dimmed())
            })
            .collect();
        FormattedString(lines.join("\n"))
    }
}

fn metadata_lines(metadata: &[MetadataEntry]) -> String {
    metadata
        .iter()
        .map(|entry| {
            let rendered = if entry.is_binary() {
                hex::encode(&entry.value)
            } else {
                entry.render()
            };
            format!("  {}: {}", entry.key.dimmed(), rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcdeck_core::session::CallStatus;
    use serde_json::json;

    fn inbound(body: serde_json::Value, status: Option<CallStatus>) -> InboundData {
        InboundData {
            id: "echo.EchoService/UnaryEcho".into(),
            body,
            metadata: vec![],
            status,
        }
    }

    #[test]
    fn test_response_with_error_field_is_printed_as_a_message() {
        let data = inbound(
            json!({ "error": { "code": 7, "message": "not a status" }, "retry": false }),
            None,
        );

        let FormattedString(out) = FormattedString::from(&data);
        assert!(!out.contains("gRPC Failed"));
        assert!(out.contains("not a status"));
    }

    #[test]
    fn test_status_is_printed_as_a_failure() {
        let status = CallStatus {
            code: 3,
            message: "rejected on purpose".to_string(),
        };
        let data = inbound(
            json!({ "error": { "code": 3, "message": "rejected on purpose" } }),
            Some(status),
        );

        let FormattedString(out) = FormattedString::from(&data);
        assert!(out.contains("gRPC Failed:"));
        assert!(out.contains("code=3"));
        assert!(out.contains("rejected on purpose"));
    }
}
