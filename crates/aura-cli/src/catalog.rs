//! `catalog` command handlers.

use clap::Subcommand;

use aura_core::{Category, Product};
use aura_state::{CatalogOrigin, ProductSort};

use crate::App;

#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// List active products
    List {
        /// Only show this category (e.g. skincare)
        #[arg(long)]
        category: Option<Category>,
        /// Match against name, description and tags
        #[arg(long)]
        search: Option<String>,
        /// Order by name, price or rating
        #[arg(long, default_value = "name")]
        sort: ProductSort,
    },
}

pub(crate) async fn run(app: &App, command: CatalogCommands) -> anyhow::Result<()> {
    match command {
        CatalogCommands::List {
            category,
            search,
            sort,
        } => run_catalog_list(app, category, search, sort).await,
    }
}

/// Loads the catalog (falling back to the seed file) and prints the
/// products that survive the filters.
///
/// # Errors
///
/// Returns an error if neither the catalog service nor the seed file can
/// provide a catalog.
async fn run_catalog_list(
    app: &App,
    category: Option<Category>,
    search: Option<String>,
    sort: ProductSort,
) -> anyhow::Result<()> {
    let outcome = app.refresher().refresh().await?;
    if outcome.origin == CatalogOrigin::Seed {
        eprintln!("catalog service unavailable; showing the offline catalog");
    }

    app.store.set_category(category);
    app.store.set_search_query(search.unwrap_or_default());
    app.store.set_product_sort(sort);

    let state = app.store.snapshot();
    let products = state.visible_products();

    if app.json {
        return App::print_json(&products);
    }
    if products.is_empty() {
        println!("no products match");
        return Ok(());
    }

    println!(
        "{:<8}{:<32}{:<12}{:>10}{:>8}",
        "ID", "NAME", "CATEGORY", "PRICE", "RATING"
    );
    for product in products {
        println!("{}", format_product_row(product));
    }
    Ok(())
}

fn format_product_row(product: &Product) -> String {
    let name = if product.name.chars().count() > 30 {
        format!("{}...", product.name.chars().take(27).collect::<String>())
    } else {
        product.name.clone()
    };
    format!(
        "{:<8}{:<32}{:<12}{:>10}{:>8.1}",
        product.id.as_str(),
        name,
        product.category.as_str(),
        product.price,
        product.rating
    )
}
