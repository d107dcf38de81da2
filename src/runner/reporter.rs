use crate::runner::types::{ChainRunResult, ChainSummary, StepOutcome, StepResult};
use crate::utils::{ResponseFormat, ResponseFormatter};
use crate::variable::types::{SECRET_MASK, mask_secrets};
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};

pub struct TestReporter {
    verbose: bool,
    formatter: ResponseFormatter,
}

impl TestReporter {
    pub fn new(verbose: bool) -> Self {
        let format = if verbose {
            ResponseFormat::Verbose
        } else {
            ResponseFormat::Compact
        };

        Self {
            verbose,
            formatter: ResponseFormatter::new(format),
        }
    }

    /// 打印链开始
    pub fn print_header(&self, chain_name: &str, environment: Option<&str>, total: usize) {
        let env_part = environment
            .map(|e| format!(" [{}]", e.cyan()))
            .unwrap_or_default();
        println!("\nRunning chain {}{} ({} steps)...\n", chain_name.bold(), env_part, total);
    }

    /// 打印完整运行结果
    pub fn print_run(&self, run: &ChainRunResult) {
        for (index, step) in run.steps.iter().enumerate() {
            self.print_step(index + 1, step, &run.secret_keys);
        }

        if let Some(reason) = &run.abort_reason {
            println!(" {} {}\n", "Aborted:".red().bold(), reason);
        }

        self.print_summary(&run.summary());

        if self.verbose && !run.variables.is_empty() {
            println!("{}", "Variables".bold());
            for (key, value) in masked(&run.variables, &run.secret_keys) {
                println!("  {} = {}", key.cyan(), value);
            }
            println!();
        }
    }

    /// 打印单个步骤结果
    pub fn print_step(&self, number: usize, step: &StepResult, secret_keys: &BTreeSet<String>) {
        let target = step
            .request
            .as_ref()
            .map(|r| format!("{} {}", r.method.to_string().cyan(), mask_secrets(&r.url, &step.scope, secret_keys)))
            .unwrap_or_else(|| step.request_id.dimmed().to_string());

        match step.outcome {
            StepOutcome::Skipped => {
                println!(
                    " {} [{}] {} - {} {}",
                    "⊘".dimmed(),
                    number,
                    step.display_name(),
                    target,
                    format!("(skipped: {})", step.skip_reason.as_deref().unwrap_or("-")).dimmed()
                );
                return;
            }
            StepOutcome::Succeeded => println!(
                " {} [{}] {} - {} ({}ms)",
                "✓".green(),
                number,
                step.display_name(),
                target,
                step.duration.as_millis()
            ),
            StepOutcome::Failed => println!(
                " {} [{}] {} - {} ({}ms)",
                "✗".red(),
                number,
                step.display_name(),
                target,
                step.duration.as_millis()
            ),
        }

        // verbose 或失败时显示响应
        if (self.verbose || !step.is_success())
            && let Some(response) = &step.response
            && !response.is_transport_error()
        {
            for line in self.formatter.format(response).lines() {
                println!("   {}", line);
            }
            println!();
        }

        if let Some(error) = &step.error {
            println!("   {}: {}", "Error".red().bold(), error);
            println!();
        }

        if !step.extractions.is_empty() && self.verbose {
            println!("   Extracted:");
            for record in &step.extractions {
                let shown = match (&record.value, secret_keys.contains(&record.variable)) {
                    (Some(_), true) => SECRET_MASK.to_string(),
                    (Some(value), false) => value.clone(),
                    (None, _) => "<unset>".to_string(),
                };
                match &record.miss {
                    Some(miss) => println!("     {} = {} {}", record.variable, shown, format!("({})", miss).yellow()),
                    None => println!("     {} = {}", record.variable, shown),
                }
            }
            println!();
        }

        if !step.assertions.is_empty() {
            println!("   Assertions:");
            for assertion in &step.assertions {
                if assertion.passed {
                    println!("     {} {}", "✓".green(), assertion.description);
                } else {
                    println!("     {} {}", "✗".red(), assertion.description);
                    if let Some(msg) = &assertion.error {
                        println!("       {}", msg.red());
                    }
                }
            }
            println!();
        }
    }

    /// 打印测试摘要
    pub fn print_summary(&self, summary: &ChainSummary) {
        println!("\n{}", "━".repeat(50));
        println!("{}", "Summary".bold());
        println!("{}", "━".repeat(50));

        if summary.skipped > 0 {
            println!(
                "  {}: {} passed, {} failed, {} skipped, {} total",
                "Steps".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.skipped.to_string().dimmed(),
                summary.total
            );
        } else if summary.failed == 0 {
            println!(
                "  {}: {} passed, {} total",
                "Steps".bold(),
                summary.passed.to_string().green(),
                summary.total
            );
        } else {
            println!(
                "  {}: {} passed, {} failed, {} total",
                "Steps".bold(),
                summary.passed.to_string().green(),
                summary.failed.to_string().red(),
                summary.total
            );
        }

        if summary.total_assertions > 0 {
            if summary.failed_assertions == 0 {
                println!(
                    "  {}: {} passed, {} total",
                    "Assertions".bold(),
                    summary.passed_assertions.to_string().green(),
                    summary.total_assertions
                );
            } else {
                println!(
                    "  {}: {} passed, {} failed, {} total",
                    "Assertions".bold(),
                    summary.passed_assertions.to_string().green(),
                    summary.failed_assertions.to_string().red(),
                    summary.total_assertions
                );
            }
        }

        println!(
            "  {}: {:.3}s",
            "Duration".bold(),
            summary.total_duration.as_secs_f64()
        );
        println!();
    }
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// secret 变量替换为遮盖值
pub fn masked(variables: &BTreeMap<String, String>, secret_keys: &BTreeSet<String>) -> BTreeMap<String, String> {
    variables
        .iter()
        .map(|(k, v)| {
            let shown = if secret_keys.contains(k) {
                SECRET_MASK.to_string()
            } else {
                v.clone()
            };
            (k.clone(), shown)
        })
        .collect()
}
