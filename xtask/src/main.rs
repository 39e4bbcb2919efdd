// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Build automation and scripting tasks for Topos
// Run with: cargo xtask <command>

use std::process::Command;
use std::time::Instant;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

// Visual symbols
const CHECK: &str = "✓";
const CROSS: &str = "✗";

/// The tasks the pipeline knows, as (name, args, description).
const TASKS: &[(&str, &[&str], &str)] = &[
    (
        "build",
        &["build", "--workspace"],
        "Compile all workspace crates in debug mode",
    ),
    (
        "test",
        &["test", "--workspace"],
        "Run unit tests, integration tests and doc tests",
    ),
    (
        "check",
        &["check", "--workspace"],
        "Check code for errors without building executables",
    ),
    (
        "format",
        &["fmt", "--all"],
        "Format code using rustfmt with default settings",
    ),
    (
        "clippy",
        &["clippy", "--workspace", "--", "-D", "warnings"],
        "Run the Clippy linter with warnings as errors",
    ),
];

fn print_banner() {
    println!("{BOLD}{CYAN}");
    println!("╔═══════════════════════════════════════════╗");
    println!("║                   TOPOS                   ║");
    println!("║           Build Automation Tool           ║");
    println!("╚═══════════════════════════════════════════╝");
    println!("{RESET}");
}

fn print_help() {
    print_banner();
    println!("{BOLD}{YELLOW}Usage:{RESET} cargo xtask <command>\n");
    println!("{BOLD}Available commands:{RESET}");
    for (name, _, description) in TASKS {
        println!("  {BLUE}{BOLD}{name:8}{RESET} - {description}");
    }
    println!("  {RED}{BOLD}ci      {RESET} - Run every task above in order");
}

fn execute_task(name: &str, args: &[&str]) -> bool {
    let start_time = Instant::now();
    println!("\n{BOLD}{CYAN}━━━ {name} ━━━{RESET}");
    println!("{BOLD}Command:{RESET} cargo {}", args.join(" "));

    let status = Command::new("cargo").args(args).status();
    let duration = start_time.elapsed();

    match status {
        Ok(status) if status.success() => {
            println!(
                "{BOLD}{GREEN}{CHECK} {name} completed in {:.2}s{RESET}",
                duration.as_secs_f64()
            );
            true
        }
        Ok(_) => {
            println!(
                "{BOLD}{RED}{CROSS} {name} failed after {:.2}s{RESET}",
                duration.as_secs_f64()
            );
            false
        }
        Err(error) => {
            println!("{BOLD}{RED}{CROSS} failed to execute {name}: {error}{RESET}");
            false
        }
    }
}

fn ci() {
    print_banner();
    println!("{BOLD}{CYAN}Running the full pipeline...{RESET}");

    let start_time = Instant::now();
    let mut succeeded = 0;

    for &(name, args, description) in TASKS {
        println!("{BOLD}Info:{RESET} {description}");
        if execute_task(name, args) {
            succeeded += 1;
        }
    }

    let total = TASKS.len();
    println!();
    if succeeded == total {
        println!("{BOLD}{GREEN}{CHECK} All {total} tasks completed successfully!{RESET}");
    } else {
        println!("{BOLD}{YELLOW}⚠ {succeeded}/{total} tasks completed{RESET}");
    }
    println!(
        "{BOLD}{BLUE}Total time: {:.2}s{RESET}",
        start_time.elapsed().as_secs_f64()
    );
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_help();
        return;
    };

    if command == "ci" || command == "all" {
        ci();
        return;
    }

    match TASKS.iter().find(|(name, _, _)| *name == command.as_str()) {
        Some(&(name, task_args, _)) => {
            execute_task(name, task_args);
        }
        None => {
            println!("{BOLD}{RED}{CROSS} Unknown command: {command}{RESET}\n");
            print_help();
        }
    }
}
