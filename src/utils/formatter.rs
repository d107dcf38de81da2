use crate::http::ResponseRecord;
use colored::*;

pub enum ResponseFormat {
    Compact,
    Verbose,
}

/// 终端响应格式化
pub struct ResponseFormatter {
    format: ResponseFormat,
    color: bool,
    show_body: bool,
    show_headers: bool,
    show_timing: bool,
}

impl ResponseFormatter {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            color: true,
            show_body: true,
            show_headers: true,
            show_timing: true,
        }
    }

    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn format(&self, response: &ResponseRecord) -> String {
        let mut output = vec![self.status_line(response)];

        if self.show_timing {
            output.push(self.paint(
                &format!("Time: {}ms  Size: {} bytes", response.elapsed_ms(), response.size_bytes()),
                |s| s.cyan(),
            ));
        }

        if let Some(error) = response.error() {
            output.push(self.paint(&format!("Error: {}", error), |s| s.red()));
            return output.join("\n");
        }

        let verbose = matches!(self.format, ResponseFormat::Verbose);
        if verbose && self.show_headers {
            output.push(String::new());
            output.push(self.paint("Headers:", |s| s.blue().bold()));
            for (key, value) in response.headers() {
                output.push(self.paint(&format!("   {}: {}", key, value), |s| s.blue()));
            }
        }

        if self.show_body {
            let body = response.body();
            if verbose && !body.is_empty() {
                output.push(String::new());
                output.push(self.paint("Body:", |s| s.blue().bold()));
                output.push(pretty_body(response));
            } else if !body.is_empty() && body.len() < 200 {
                output.push(pretty_body(response));
            } else if !body.is_empty() {
                output.push(format!("Body: {} bytes", body.len()));
            }
        }

        output.join("\n")
    }

    fn status_line(&self, response: &ResponseRecord) -> String {
        let status_line = format!("HTTP {} {}", response.status_code(), display_status_text(response));
        if !self.color {
            return status_line;
        }
        let colored = if response.is_success() {
            status_line.green()
        } else if response.is_client_error() {
            status_line.yellow()
        } else {
            status_line.red()
        };
        match self.format {
            ResponseFormat::Verbose => colored.bold().to_string(),
            ResponseFormat::Compact => colored.to_string(),
        }
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn display_status_text(response: &ResponseRecord) -> &str {
    if response.status_text().is_empty() {
        response.status().reason_phrase()
    } else {
        response.status_text()
    }
}

/// JSON body 美化输出，非 JSON 原样返回
fn pretty_body(response: &ResponseRecord) -> String {
    response
        .json()
        .and_then(|value| serde_json::to_string_pretty(value).ok())
        .unwrap_or_else(|| response.body().to_string())
}
