//! Drone - 命令行入口
//!
//! 用法：`drone <message…>`，无参数时从 stdin 读取消息；答案输出到 stdout，过程事件与日志输出到 stderr。
//! 配置文件可通过 DRONE_CONFIG 指定。

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use drone::config::load_config;
use drone::core::AgentBuilder;
use drone::memory::Message;
use drone::react::AgentEvent;
use drone::{observability, run_agent};
use tokio::sync::mpsc;

fn read_input() -> anyhow::Result<String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return Ok(args.join(" "));
    }
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read message from stdin")?;
    Ok(input.trim().to_string())
}

fn print_event(ev: &AgentEvent) {
    match ev {
        AgentEvent::StepUpdate { step, max_steps } => eprintln!("── step {}/{}", step, max_steps),
        AgentEvent::Plan { reasoning, tool, query } => {
            eprintln!("plan: {} -> {} ({})", reasoning, tool.as_deref().unwrap_or("-"), query)
        }
        AgentEvent::Parameters { tool, parameters } => eprintln!("params[{}]: {}", tool, parameters),
        AgentEvent::ContextSelected { uuids, .. } => eprintln!("context: {} document(s)", uuids.len()),
        AgentEvent::Observation {
            tool,
            documents,
            errors,
            preview,
        } => eprintln!("observe[{}]: {} doc(s), {} error(s): {}", tool, documents, errors, preview),
        AgentEvent::Answer { .. } => {}
        AgentEvent::Error { text } => eprintln!("error: {}", text),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let message = read_input()?;
    if message.is_empty() {
        anyhow::bail!("Usage: drone <message…> (or pipe the message on stdin)");
    }

    let config_path = std::env::var("DRONE_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;
    cfg.ensure_dirs().context("Failed to create workspace directories")?;
    let components = AgentBuilder::new(cfg).build().context("Failed to build agent")?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(ev) = rx.recv().await {
            print_event(&ev);
        }
    });

    let result = run_agent(&components, vec![Message::user(message)], None, Some(tx)).await;
    let _ = printer.await;
    let run = result.context("Agent run failed")?;

    println!("{}", run.answer);
    Ok(())
}
