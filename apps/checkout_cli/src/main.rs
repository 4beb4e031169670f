use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    order_form::prepare_phone, BranchTypeMode, CarrierLookup, ControllerConfig,
    DeliveryController, HttpCarrierLookup, SnapshotView,
};
use shared::domain::{CityRef, DeliveryMethod, PaymentMethod, WarehouseType};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Drive the checkout delivery form against a lookup server")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    SearchCities {
        query: String,
    },
    Warehouses {
        city_ref: String,
        /// warehouse, postomat, or empty for both
        #[arg(long = "type", default_value = "")]
        kind: String,
    },
    Walkthrough {
        #[arg(long, default_value = "nova_poshta")]
        method: String,
        #[arg(long)]
        city_query: Option<String>,
        #[arg(long, default_value_t = 0)]
        city_index: usize,
        /// Switches to the explicit branch-type selector.
        #[arg(long)]
        warehouse_type: Option<String>,
        #[arg(long)]
        warehouse_filter: Option<String>,
        #[arg(long, default_value_t = 0)]
        warehouse_index: usize,
        /// Free-text city for methods without carrier lookup.
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        payment: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
}

struct WalkthroughArgs {
    method: DeliveryMethod,
    city_query: Option<String>,
    city_index: usize,
    warehouse_type: Option<WarehouseType>,
    warehouse_filter: Option<String>,
    warehouse_index: usize,
    city: Option<String>,
    address: Option<String>,
    payment: Option<PaymentMethod>,
    phone: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let lookup = HttpCarrierLookup::new(&cli.server_url)
        .with_context(|| format!("invalid server url '{}'", cli.server_url))?;

    match cli.command {
        Command::SearchCities { query } => {
            let cities = lookup.search_cities(&query).await?;
            for city in cities {
                println!("{}\t{}", city.city_ref, city.present);
            }
        }
        Command::Warehouses { city_ref, kind } => {
            let kind = WarehouseType::parse_optional(&kind)?;
            let warehouses = lookup
                .list_warehouses(&CityRef::new(city_ref), kind)
                .await?;
            for warehouse in warehouses {
                println!(
                    "{}\t{}\t#{}\t{}",
                    warehouse.warehouse_ref,
                    warehouse.kind(),
                    warehouse.number,
                    warehouse.description
                );
            }
        }
        Command::Walkthrough {
            method,
            city_query,
            city_index,
            warehouse_type,
            warehouse_filter,
            warehouse_index,
            city,
            address,
            payment,
            phone,
        } => {
            let args = WalkthroughArgs {
                method: method.parse::<DeliveryMethod>()?,
                city_query,
                city_index,
                warehouse_type: warehouse_type
                    .as_deref()
                    .map(WarehouseType::parse_optional)
                    .transpose()?
                    .flatten(),
                warehouse_filter,
                warehouse_index,
                city,
                address,
                payment: payment
                    .as_deref()
                    .map(str::parse::<PaymentMethod>)
                    .transpose()?,
                phone,
            };
            walkthrough(lookup, args).await?;
        }
    }

    Ok(())
}

async fn walkthrough(lookup: HttpCarrierLookup, args: WalkthroughArgs) -> Result<()> {
    let config = ControllerConfig {
        branch_type_mode: if args.warehouse_type.is_some() {
            BranchTypeMode::Explicit
        } else {
            BranchTypeMode::Inferred
        },
        ..ControllerConfig::default()
    };
    let mode = config.branch_type_mode;
    let view = SnapshotView::new();
    let controller = DeliveryController::new(
        config,
        args.method,
        args.payment,
        Arc::new(view.clone()),
        Arc::new(lookup),
    );

    match args.method {
        DeliveryMethod::NovaPoshta => {
            let query = args
                .city_query
                .ok_or_else(|| anyhow!("--city-query is required for nova_poshta"))?;
            controller.search_cities(&query).await;
            let cities = view.snapshot().city_suggestions.unwrap_or_default();
            let city = cities
                .get(args.city_index)
                .cloned()
                .ok_or_else(|| anyhow!("no city #{} for '{query}'", args.city_index))?;
            info!(city = %city.present, "walkthrough: picking city");
            controller.on_city_selected(city).await;

            if let Some(kind) = args.warehouse_type {
                controller.on_warehouse_type_changed(Some(kind)).await;
            }
            if let Some(filter) = &args.warehouse_filter {
                if mode == BranchTypeMode::Explicit {
                    bail!("--warehouse-filter cannot be combined with --warehouse-type");
                }
                controller.on_address_input_typed(filter).await;
            }

            let listed = view.snapshot().listed_warehouses().to_vec();
            let warehouse = listed
                .get(args.warehouse_index)
                .ok_or_else(|| anyhow!("no branch #{} listed", args.warehouse_index))?;
            controller.on_warehouse_selected(warehouse).await;
        }
        DeliveryMethod::Ukrposhta | DeliveryMethod::Courier => {
            if let Some(city) = &args.city {
                controller.on_city_input_changed(city).await;
            }
            if let Some(address) = &args.address {
                controller.on_address_input_typed(address).await;
            }
        }
        DeliveryMethod::Pickup => {}
    }

    if let Some(payment) = args.payment {
        controller.on_payment_method_checked(payment).await;
    }

    let fields = controller.submission().await;
    println!("{}", serde_json::to_string_pretty(&fields)?);

    fields.check(mode, &controller.config().payment_methods)?;
    if let Some(phone) = args.phone {
        println!("phone: {}", prepare_phone(&phone)?);
    }
    Ok(())
}
