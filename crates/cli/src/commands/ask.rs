//! `studybot ask`: single-question or interactive mode.

use std::path::Path;
use studybot_agent::{QueryOutcome, QueryPipeline};
use studybot_core::message::{ChatHistory, Message};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    course: &str,
    message: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let layout = config.course_layout(course)?;
    let provider = studybot_providers::build_from_config(&config.provider)?;
    let model = config.provider.model.clone();
    let pipeline =
        QueryPipeline::new(config, provider).with_event_bus(super::events::logged_bus());

    if let Some(question) = message {
        eprint!("  Thinking...");
        let outcome = pipeline.run_query(&question, course, &ChatHistory::new()).await;
        eprint!("\r              \r");
        print_outcome(&pipeline, &outcome, json)?;
        return Ok(());
    }

    println!();
    println!("  studybot: {} ({})", layout.name, layout.id);
    println!("  Model: {model}");
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut history = ChatHistory::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    use std::io::Write;
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if !question.is_empty() {
            eprint!("  ...");
            let outcome = pipeline.run_query(question, course, &history).await;
            eprint!("\r     \r");
            let text = pipeline.render(&outcome);

            println!();
            for line in text.lines() {
                println!("  studybot > {line}");
            }
            println!();

            if outcome.is_answered() {
                history.push(Message::user(question));
                history.push(Message::assistant(text));
            }
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    Ok(())
}

fn print_outcome(
    pipeline: &QueryPipeline,
    outcome: &QueryOutcome,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{}", pipeline.render(outcome));
    }
    Ok(())
}
