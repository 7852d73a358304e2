//! One store instance driven by CLI commands, either a single command or a
//! line-per-command shell reading stdin.
//!
//! Bids are client-local, so a lot only counts as won within the session
//! that bid on it.

use std::{
    io::{BufRead, Write},
    rc::Rc,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use event_bus::Subscription;
use shared::domain::{Amount, LotId, OrderField};
use storefront_core::{
    events::publish, install_event_logger, wire_order_form, AppState, AuctionApi, AuctionEvent,
    Clock, LotItem, StoreBus, StoreOptions, StorefrontController,
};
use tracing::debug;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List open and closed lots.
    List,
    /// Fetch and print one lot with its bid history.
    Show { id: String },
    /// Bid on an open lot. Uses the minimum next bid when no amount is given.
    Bid { id: String, amount: Option<Amount> },
    /// Order closed lots. With the default policy only lots won earlier in
    /// the same shell qualify; pass `--any-closed` to order any closed lot.
    Order {
        #[arg(long = "lot", required = true)]
        lots: Vec<String>,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
    },
}

/// A shell line, parsed with the same grammar as the subcommands.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

pub struct Session {
    bus: StoreBus,
    state: Rc<AppState>,
    controller: StorefrontController,
    _subscriptions: Vec<Subscription>,
}

impl Session {
    pub fn new(
        api: Arc<dyn AuctionApi>,
        clock: Rc<dyn Clock>,
        options: StoreOptions,
    ) -> Result<Self> {
        let bus = StoreBus::new();
        let event_log = install_event_logger(&bus);
        let state = AppState::new(bus.clone(), clock, options);
        let order_form = wire_order_form(&bus, &state).context("failed to wire order form")?;
        let controller = StorefrontController::new(api, Rc::clone(&state));
        Ok(Self {
            bus,
            state,
            controller,
            _subscriptions: vec![event_log, order_form],
        })
    }

    pub async fn load(&self) -> Result<()> {
        if !self.controller.load_catalog().await {
            bail!("could not load the lot catalog");
        }
        Ok(())
    }

    /// Runs commands until `quit`, `exit` or end of input. A failing command
    /// is reported and the shell keeps going.
    pub async fn run_shell(&self, input: impl BufRead, out: &mut impl Write) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read command")?;
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                [] => continue,
                ["quit"] | ["exit"] => break,
                _ => {}
            }
            let command = match ShellLine::try_parse_from(tokens.iter().copied()) {
                Ok(parsed) => parsed.command,
                Err(err) => {
                    write!(out, "{err}")?;
                    continue;
                }
            };
            debug!(?command, "shell command");
            if let Err(err) = self.execute(command, out).await {
                writeln!(out, "error: {err:#}")?;
            }
        }
        Ok(())
    }

    pub async fn execute(&self, command: Command, out: &mut impl Write) -> Result<()> {
        let now = self.state.now();
        match command {
            Command::List => {
                writeln!(out, "Open lots:")?;
                for lot in self.state.get_active_lots() {
                    writeln!(out, "  {}", summary_line(&lot, now))?;
                }
                writeln!(out, "Closed lots ({}):", self.state.closed_count())?;
                for lot in self.state.get_closed_lots() {
                    writeln!(out, "  {}", summary_line(&lot, now))?;
                }
            }
            Command::Show { id } => {
                let id = LotId::from(id);
                if !self.controller.open_preview(id.clone()).await {
                    bail!("could not load lot {id}");
                }
                let lot = self
                    .state
                    .preview()
                    .with_context(|| format!("lot {id} not found"))?;
                writeln!(out, "{} [{}]", lot.title, lot.id)?;
                writeln!(out, "{}", lot.status_label(now))?;
                writeln!(out, "{}", lot.time_status(now))?;
                writeln!(out, "{}", lot.auction_status(now))?;
                if !lot.description.is_empty() {
                    writeln!(out, "\n{}", lot.description)?;
                }
                for bid in lot.history() {
                    writeln!(
                        out,
                        "  {} {} {}",
                        bid.timestamp.format("%d.%m %H:%M"),
                        bid.bidder_tag,
                        bid.amount
                    )?;
                }
            }
            Command::Bid { id, amount } => {
                let id = LotId::from(id);
                let amount = match amount {
                    Some(amount) => amount,
                    None => self.state.next_bid(&id)?,
                };
                self.state.place_bid(&id, amount)?;
                let lot = self
                    .state
                    .lot(&id)
                    .with_context(|| format!("lot {id} not found"))?;
                writeln!(out, "{}", lot.auction_status(now))?;
            }
            Command::Order { lots, email, phone } => {
                for id in lots.into_iter().map(LotId::from) {
                    if !self.state.toggle_ordered_lot(&id, true) {
                        writeln!(out, "skipping lot {id}: not available for ordering")?;
                    }
                }
                // Routed into the contact form by the `order.<field>:change` subscription.
                for (field, value) in [(OrderField::Email, email), (OrderField::Phone, phone)] {
                    publish(&self.bus, AuctionEvent::OrderField { field, value });
                }
                for (field, message) in self.state.field_errors() {
                    writeln!(out, "{field}: {message}")?;
                }

                let total = self.state.get_total();
                match self.controller.submit_order().await {
                    Some(confirmation) => {
                        writeln!(out, "order {} placed, total {total}", confirmation.id)?
                    }
                    None => bail!("order was not placed"),
                }
            }
        }
        Ok(())
    }
}

fn summary_line(lot: &LotItem, now: DateTime<Utc>) -> String {
    format!(
        "{:<8} {:<32} {:>8}  {}",
        lot.id.as_str(),
        lot.title,
        lot.price(),
        lot.time_status(now)
    )
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
