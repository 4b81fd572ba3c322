use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use crate::application::{AccountService, ManualClock};
use crate::domain::{
    compute_balance, format_cents, parse_cents, Cents, Customer, Operation, StatementSummary,
};
use crate::io::Exporter;

/// One line of session input
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    /// Register a new account
    Register {
        /// Tax id (CPF) of the account holder
        cpf: String,

        /// Display name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Show the statement of an account
    Statement {
        cpf: String,

        /// Only operations recorded on this day (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Deposit money into an account
    Deposit {
        cpf: String,

        /// Amount (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true, value_parser = parse_cents)]
        amount: Cents,

        /// Description of the deposit
        description: Vec<String>,
    },

    /// Withdraw money from an account
    Withdraw {
        cpf: String,

        /// Amount (e.g., "50.00" or "50")
        #[arg(allow_hyphen_values = true, value_parser = parse_cents)]
        amount: Cents,

        /// Description of the withdrawal
        description: Vec<String>,
    },

    /// Change the display name of an account
    Rename {
        cpf: String,

        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Show an account with its statement
    Account { cpf: String },

    /// Delete an account
    Delete { cpf: String },

    /// Show the current balance of an account
    Balance { cpf: String },

    /// Show credit and debit totals of an account
    Summary { cpf: String },

    /// List all accounts
    Accounts,

    /// Export the statement of an account
    Export {
        cpf: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (session output if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Move the session clock (only with --clock)
    At {
        /// YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or RFC 3339
        when: String,
    },

    /// End the session
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Whether the session should keep reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Result of one command, before rendering
#[derive(Debug)]
pub enum Reply {
    Registered(Customer),
    Renamed(Customer),
    Account(Customer),
    Accounts(Vec<Customer>),
    Deleted { remaining: Vec<Customer> },
    Operation(Operation),
    Statement(Vec<Operation>),
    Balance(Cents),
    Summary(StatementSummary),
    Exported { count: usize, path: String },
    ClockSet(DateTime<Utc>),
    /// Output was already written by the command
    Written,
    Help(String),
    Quit,
}

/// A command session over one in-memory account service.
///
/// Each input line is parsed as a command, executed and rendered to `out`,
/// either as text or as one JSON document per line.
pub struct Session<W: Write> {
    service: AccountService,
    clock: Option<Arc<ManualClock>>,
    out: W,
    json: bool,
}

impl<W: Write> Session<W> {
    pub fn new(service: AccountService, out: W, json: bool) -> Self {
        Self {
            service,
            clock: None,
            out,
            json,
        }
    }

    /// Let the `at` command drive operation timestamps.
    pub fn with_manual_clock(mut self, clock: Option<Arc<ManualClock>>) -> Self {
        self.clock = clock;
        self
    }

    pub fn service(&self) -> &AccountService {
        &self.service
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Parse, execute and render a single input line.
    /// Blank lines and lines starting with '#' are ignored.
    pub fn handle_line(&mut self, line: &str) -> Result<Flow> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Flow::Continue);
        }

        let reply = self.execute(line)?;
        let flow = if matches!(reply, Reply::Quit) {
            Flow::Quit
        } else {
            Flow::Continue
        };
        self.render(&reply)?;
        Ok(flow)
    }

    /// Parse and execute a command line without rendering it.
    pub fn execute(&mut self, line: &str) -> Result<Reply> {
        let parsed = match SessionLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed,
            Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
                return Ok(Reply::Help(err.render().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let service = &self.service;
        let reply = match parsed.command {
            SessionCommand::Register { cpf, name } => {
                Reply::Registered(service.register(&cpf, &name.join(" "))?)
            }
            SessionCommand::Statement { cpf, date: Some(date) } => {
                Reply::Statement(service.statement_on(&cpf, date)?)
            }
            SessionCommand::Statement { cpf, date: None } => {
                Reply::Statement(service.statement(&cpf)?)
            }
            SessionCommand::Deposit {
                cpf,
                amount,
                description,
            } => Reply::Operation(service.deposit(&cpf, amount, join_words(description))?),
            SessionCommand::Withdraw {
                cpf,
                amount,
                description,
            } => Reply::Operation(service.withdraw(&cpf, amount, join_words(description))?),
            SessionCommand::Rename { cpf, name } => {
                Reply::Renamed(service.rename(&cpf, &name.join(" "))?)
            }
            SessionCommand::Account { cpf } => Reply::Account(service.account(&cpf)?),
            SessionCommand::Delete { cpf } => Reply::Deleted {
                remaining: service.delete(&cpf)?,
            },
            SessionCommand::Balance { cpf } => Reply::Balance(service.balance(&cpf)?),
            SessionCommand::Summary { cpf } => Reply::Summary(service.summary(&cpf)?),
            SessionCommand::Accounts => Reply::Accounts(service.accounts()),
            SessionCommand::Export {
                cpf,
                format,
                output,
            } => {
                let exporter = Exporter::new(service);
                match output {
                    Some(path) => {
                        let file = File::create(&path)
                            .with_context(|| format!("Failed to create output file: {}", path))?;
                        let count = match format {
                            ExportFormat::Csv => exporter.export_statement_csv(&cpf, file)?,
                            ExportFormat::Json => {
                                exporter.export_account_json(&cpf, file)?.account.statement.len()
                            }
                        };
                        Reply::Exported { count, path }
                    }
                    None => {
                        match format {
                            ExportFormat::Csv => {
                                exporter.export_statement_csv(&cpf, &mut self.out)?;
                            }
                            ExportFormat::Json => {
                                exporter.export_account_json(&cpf, &mut self.out)?;
                            }
                        }
                        Reply::Written
                    }
                }
            }
            SessionCommand::At { when } => {
                let clock = self
                    .clock
                    .as_ref()
                    .ok_or_else(|| anyhow!("The session clock is fixed only when started with --clock"))?;
                let at = parse_instant(&when, &service.utc_offset())?;
                clock.set(at);
                Reply::ClockSet(at)
            }
            SessionCommand::Quit => Reply::Quit,
        };

        Ok(reply)
    }

    /// Report a failed command to the user.
    /// Text mode writes to stderr; JSON mode writes an error document to the output.
    pub fn report_error(&mut self, err: &anyhow::Error) -> Result<()> {
        if self.json {
            let message = match err.downcast_ref::<clap::Error>() {
                Some(clap_err) => clap_err
                    .to_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ")
                    .to_string(),
                None => format!("{:#}", err),
            };
            writeln!(self.out, "{}", json!({ "error": message }))?;
            return Ok(());
        }

        match err.downcast_ref::<clap::Error>() {
            Some(clap_err) => eprint!("{}", clap_err.render()),
            None => eprintln!("error: {:#}", err),
        }
        Ok(())
    }

    fn render(&mut self, reply: &Reply) -> Result<()> {
        if let Reply::Written | Reply::Quit = reply {
            return Ok(());
        }
        if let Reply::Help(text) = reply {
            write!(self.out, "{}", text)?;
            return Ok(());
        }

        if self.json {
            writeln!(self.out, "{}", reply_to_json(reply)?)?;
        } else {
            let offset = self.service.utc_offset();
            write_text(&mut self.out, reply, &offset)?;
        }
        Ok(())
    }
}

fn join_words(words: Vec<String>) -> Option<String> {
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn reply_to_json(reply: &Reply) -> Result<serde_json::Value> {
    let value = match reply {
        Reply::Registered(customer) | Reply::Renamed(customer) | Reply::Account(customer) => {
            serde_json::to_value(customer)?
        }
        Reply::Accounts(customers) | Reply::Deleted { remaining: customers } => {
            serde_json::to_value(customers)?
        }
        Reply::Operation(operation) => serde_json::to_value(operation)?,
        Reply::Statement(statement) => serde_json::to_value(statement)?,
        Reply::Balance(balance) => json!({ "balance": balance }),
        Reply::Summary(summary) => serde_json::to_value(summary)?,
        Reply::Exported { count, path } => json!({ "exported": count, "path": path }),
        Reply::ClockSet(at) => json!({ "now": at }),
        Reply::Written | Reply::Help(_) | Reply::Quit => serde_json::Value::Null,
    };
    Ok(value)
}

fn write_text<W: Write>(out: &mut W, reply: &Reply, offset: &FixedOffset) -> Result<()> {
    match reply {
        Reply::Registered(customer) => {
            writeln!(out, "Registered account: {} ({})", customer.name, customer.tax_id)?;
        }
        Reply::Renamed(customer) => {
            writeln!(out, "Renamed account {} to: {}", customer.tax_id, customer.name)?;
        }
        Reply::Account(customer) => {
            let balance = compute_balance(&customer.statement);
            writeln!(out, "Account: {}", customer.name)?;
            writeln!(out, "  CPF:        {}", customer.tax_id)?;
            writeln!(out, "  ID:         {}", customer.id)?;
            writeln!(
                out,
                "  Created:    {}",
                customer.created_at.with_timezone(offset).format("%Y-%m-%d %H:%M:%S")
            )?;
            writeln!(out, "  Balance:    {}", format_cents(balance))?;
            writeln!(out)?;
            write_statement(out, &customer.statement, offset)?;
        }
        Reply::Accounts(customers) => write_accounts(out, customers)?,
        Reply::Deleted { remaining } => {
            writeln!(out, "Account deleted. {} account(s) remaining.", remaining.len())?;
        }
        Reply::Operation(operation) => {
            writeln!(
                out,
                "Recorded {}: {}{}",
                operation.kind,
                format_cents(operation.amount),
                operation
                    .description
                    .as_ref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default()
            )?;
        }
        Reply::Statement(statement) => write_statement(out, statement, offset)?,
        Reply::Balance(balance) => writeln!(out, "Balance: {}", format_cents(*balance))?,
        Reply::Summary(summary) => {
            writeln!(out, "Credits:    {:>15}", format_cents(summary.credits))?;
            writeln!(out, "Debits:     {:>15}", format_cents(summary.debits))?;
            writeln!(out, "{}", "-".repeat(27))?;
            writeln!(out, "Balance:    {:>15}", format_cents(summary.balance))?;
            writeln!(out, "Operations: {:>15}", summary.operation_count)?;
        }
        Reply::Exported { count, path } => {
            writeln!(out, "Exported {} operations to {}", count, path)?;
        }
        Reply::ClockSet(at) => {
            writeln!(
                out,
                "Clock set to {}",
                at.with_timezone(offset).format("%Y-%m-%d %H:%M:%S")
            )?;
        }
        Reply::Written | Reply::Help(_) | Reply::Quit => {}
    }
    Ok(())
}

fn write_statement<W: Write>(out: &mut W, statement: &[Operation], offset: &FixedOffset) -> Result<()> {
    if statement.is_empty() {
        writeln!(out, "No operations found.")?;
        return Ok(());
    }

    writeln!(out, "{:<20} {:<8} {:>12}  DESCRIPTION", "DATE", "TYPE", "AMOUNT")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for operation in statement {
        writeln!(
            out,
            "{:<20} {:<8} {:>12}  {}",
            operation.created_at.with_timezone(offset).format("%Y-%m-%d %H:%M:%S"),
            operation.kind.as_str(),
            format_cents(operation.amount),
            operation.description.as_deref().unwrap_or("")
        )?;
    }
    Ok(())
}

fn write_accounts<W: Write>(out: &mut W, customers: &[Customer]) -> Result<()> {
    if customers.is_empty() {
        writeln!(out, "No accounts found.")?;
        return Ok(());
    }

    writeln!(out, "{:<16} {:<24} {:>12}", "CPF", "NAME", "BALANCE")?;
    writeln!(out, "{}", "-".repeat(54))?;
    for customer in customers {
        writeln!(
            out,
            "{:<16} {:<24} {:>12}",
            customer.tax_id.as_str(),
            customer.name,
            format_cents(compute_balance(&customer.statement))
        )?;
    }
    Ok(())
}

fn parse_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
}

/// Parse a point in time. Inputs without an offset are read in `offset`.
pub fn parse_instant(input: &str, offset: &FixedOffset) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| parse_date(input).map(|date| date.and_time(NaiveTime::MIN)))
        .with_context(|| {
            format!(
                "Invalid date '{}'. Use YYYY-MM-DD, YYYY-MM-DDTHH:MM:SS or RFC 3339",
                input
            )
        })?;

    match offset.from_local_datetime(&naive).single() {
        Some(at) => Ok(at.with_timezone(&Utc)),
        None => bail!("Ambiguous local time '{}'", input),
    }
}
