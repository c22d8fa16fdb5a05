//! `trials` command handlers.
//!
//! Submission goes through the app store so the cart semantics match the
//! interactive client; every other command talks to the repository, which
//! falls back to its in-process mirror when the backend exchange fails.

use anyhow::Context as _;
use clap::Subcommand;

use aura_core::{
    ProductId, SortDirection, TrialEvent, TrialFilter, TrialId, TrialRequest, TrialSortKey,
    TrialStatus,
};
use aura_gateway::{GatewayError, SessionResolver};
use aura_trials::{CartSubmitError, LifecycleController, Source, Sourced, SubmitOptions};

use crate::App;

#[derive(Debug, Subcommand)]
pub enum TrialsCommands {
    /// Request trials for one or more products (one request per product)
    Submit {
        /// Product id to request; repeat for several products
        #[arg(long = "product", required = true)]
        products: Vec<String>,
        /// Free-text memo attached to every request
        #[arg(long)]
        memo: Option<String>,
        /// Units per product (1-10)
        #[arg(long, default_value_t = aura_core::trials::DEFAULT_QUANTITY)]
        quantity: u32,
        /// Trial length in days (1-30)
        #[arg(long, default_value_t = aura_core::trials::DEFAULT_TRIAL_DURATION_DAYS)]
        days: u32,
        /// Why the customer wants to try the products
        #[arg(long)]
        reason: Option<String>,
    },
    /// List trial requests
    List {
        /// Only show requests in this status
        #[arg(long)]
        status: Option<TrialStatus>,
        /// Match customer, memo or product names
        #[arg(long)]
        search: Option<String>,
        /// created_at, updated_at or status
        #[arg(long, default_value = "created_at")]
        sort_by: TrialSortKey,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: SortDirection,
    },
    /// Approve a pending request
    Approve {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a pending request
    Reject {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark an approved request as in progress
    Start {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Complete an approved or in-progress request
    Complete {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel a request that has not finished
    Cancel {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a request that has not reached a terminal status
    Delete { id: String },
    /// Show per-status counts
    Stats,
}

pub(crate) async fn run(app: &App, command: TrialsCommands) -> anyhow::Result<()> {
    match command {
        TrialsCommands::Submit {
            products,
            memo,
            quantity,
            days,
            reason,
        } => {
            let options = SubmitOptions {
                customer: None,
                quantity,
                trial_duration_days: days,
                reason,
            };
            run_trials_submit(app, &products, memo, options).await
        }
        TrialsCommands::List {
            status,
            search,
            sort_by,
            order,
        } => {
            let filter = TrialFilter {
                status,
                search,
                sort_by,
                direction: order,
            };
            run_trials_list(app, &filter).await
        }
        TrialsCommands::Approve { id, notes } => {
            run_trials_transition(app, &id, TrialEvent::Approve, notes).await
        }
        TrialsCommands::Reject { id, notes } => {
            run_trials_transition(app, &id, TrialEvent::Reject, notes).await
        }
        TrialsCommands::Start { id, notes } => {
            run_trials_transition(app, &id, TrialEvent::Start, notes).await
        }
        TrialsCommands::Complete { id, notes } => {
            run_trials_transition(app, &id, TrialEvent::Complete, notes).await
        }
        TrialsCommands::Cancel { id, notes } => {
            run_trials_transition(app, &id, TrialEvent::Cancel, notes).await
        }
        TrialsCommands::Delete { id } => run_trials_delete(app, &id).await,
        TrialsCommands::Stats => run_trials_stats(app).await,
    }
}

/// Fills the cart with `product_ids` and submits it.
///
/// The customer identity comes from the session when a token is
/// configured; without one the requests are submitted anonymously.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, a product id is not in
/// the catalog, validation fails, or a submission fails part way. Requests
/// that went through before a failure are still printed.
async fn run_trials_submit(
    app: &App,
    product_ids: &[String],
    memo: Option<String>,
    mut options: SubmitOptions,
) -> anyhow::Result<()> {
    app.refresher().refresh().await?;
    let catalog = app.store.snapshot().products;

    for raw in product_ids {
        let id = ProductId::from(raw.as_str());
        let product = catalog
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("product '{raw}' is not in the catalog"))?;
        if !app.store.add_to_cart(product) {
            tracing::warn!(product = %id, "product listed twice, submitting it once");
        }
    }
    if let Some(memo) = memo {
        app.store.set_memo(memo);
    }

    options.customer = match app.gateway.current_session().await {
        Ok(session) => Some(session.customer_identity()),
        Err(GatewayError::MissingToken) => None,
        Err(e) => {
            tracing::warn!(error = %e, "could not resolve session, submitting anonymously");
            None
        }
    };

    match app.store.submit_trial_cart(&app.repository, &options).await {
        Ok(created) => print_requests(app, &created),
        Err(CartSubmitError::Partial {
            submitted,
            failed,
            not_attempted,
            source,
        }) => {
            print_requests(app, &submitted)?;
            Err(anyhow::Error::new(source).context(format!(
                "submission of product {failed} failed; {} product(s) not attempted \
                 and left in the cart",
                not_attempted.len()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_trials_list(app: &App, filter: &TrialFilter) -> anyhow::Result<()> {
    let listed = app.repository.list(filter).await?;
    if listed.is_local() {
        eprintln!("backend did not answer; showing requests known to this session");
    }

    if app.json {
        return App::print_json(&listed.value);
    }
    if listed.value.is_empty() {
        println!("no trial requests found");
        return Ok(());
    }
    print_header();
    for request in &listed.value {
        println!("{}", format_request_row(request, listed.source));
    }
    Ok(())
}

/// Applies `event` as the resolved role.
///
/// The mirror is warmed with a listing first so an illegal event is caught
/// before the backend is asked.
///
/// # Errors
///
/// Returns an error if the role cannot be resolved or the transition is
/// refused.
async fn run_trials_transition(
    app: &App,
    id: &str,
    event: TrialEvent,
    notes: Option<String>,
) -> anyhow::Result<()> {
    let role = app.role().await?;
    warm_mirror(app).await;

    let controller = LifecycleController::new(&app.repository, role);
    let updated = controller
        .apply(&TrialId::from(id), event, notes)
        .await
        .with_context(|| format!("failed to {event} trial request {id}"))?;

    if app.json {
        return App::print_json(&updated);
    }
    println!(
        "trial request {} is now {}{}",
        updated.value.id,
        updated.value.status,
        source_suffix(updated.source)
    );
    Ok(())
}

async fn run_trials_delete(app: &App, id: &str) -> anyhow::Result<()> {
    let role = app.role().await?;
    warm_mirror(app).await;

    let controller = LifecycleController::new(&app.repository, role);
    let deleted = controller
        .delete(&TrialId::from(id))
        .await
        .with_context(|| format!("failed to delete trial request {id}"))?;

    println!("deleted trial request {id}{}", source_suffix(deleted.source));
    Ok(())
}

async fn run_trials_stats(app: &App) -> anyhow::Result<()> {
    warm_mirror(app).await;
    let stats = app.repository.stats().await?;

    if app.json {
        return App::print_json(&stats);
    }
    let s = stats.value;
    println!("total:       {}{}", s.total, source_suffix(stats.source));
    println!("pending:     {}", s.pending);
    println!("approved:    {}", s.approved);
    println!("in progress: {}", s.in_progress);
    println!("completed:   {}", s.completed);
    println!("rejected:    {}", s.rejected);
    println!("cancelled:   {}", s.cancelled);
    Ok(())
}

async fn warm_mirror(app: &App) {
    if let Err(e) = app.repository.list(&TrialFilter::default()).await {
        tracing::warn!(error = %e, "could not load trial requests before acting");
    }
}

fn print_requests(app: &App, requests: &[Sourced<TrialRequest>]) -> anyhow::Result<()> {
    if app.json {
        return App::print_json(requests);
    }
    print_header();
    for request in requests {
        println!("{}", format_request_row(&request.value, request.source));
    }
    Ok(())
}

fn print_header() {
    println!(
        "{:<28}{:<13}{:<30}{:<24}CREATED",
        "ID", "STATUS", "PRODUCTS", "CUSTOMER"
    );
}

fn source_suffix(source: Source) -> &'static str {
    match source {
        Source::Remote => "",
        Source::Local => " (stored locally)",
    }
}

pub(crate) fn format_request_row(request: &TrialRequest, source: Source) -> String {
    let products = request
        .products
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let products = if products.chars().count() > 28 {
        format!("{}...", products.chars().take(25).collect::<String>())
    } else {
        products
    };
    let customer = request
        .customer
        .as_ref()
        .map_or_else(|| "-".to_string(), |c| c.name.clone());
    format!(
        "{:<28}{:<13}{:<30}{:<24}{}{}",
        request.id.as_str(),
        request.status.as_str(),
        products,
        customer,
        request.created_at.format("%Y-%m-%d %H:%M"),
        source_suffix(source)
    )
}
