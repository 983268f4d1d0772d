use anyhow::{Context, Result, bail};
use async_std::fs;
use chrono::{Datelike, Local, NaiveDate};
use clap::{Arg, ArgMatches, Command};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use walaka::document::{InvoiceDocument, discount_display, populate};
use walaka::labels::{Language, parse_date};
use walaka::metrics::{Dashboard, InvoiceSummary, WEEKDAYS};
use walaka::numbering::{SUBSCRIPTION_PREFIX, next_number_from};
use walaka::plan::{PLANS, subscribe, trial_status, vendor};
use walaka::publish::{DirStore, PrintPdf, RenderInput, publish};
use walaka::receipt::raw;
use walaka::settings::Settings;
use walaka::template::select_template_with_accent;
use walaka::validation::validate;
use walaka::*;

fn date_arg(matches: &ArgMatches, name: &str) -> Result<NaiveDate> {
    match matches.value_of(name) {
        Some(text) => parse_date(text).with_context(|| format!("Bad date '{}', expected YYYY-MM-DD", text)),
        None => Ok(Local::now().date_naive()),
    }
}

fn store(matches: &ArgMatches) -> DirStore {
    let store = DirStore::new(matches.value_of("out").unwrap_or("."));
    match matches.value_of("base url") {
        Some(base_url) => store.with_base_url(base_url),
        None => store,
    }
}

fn out_args(command: Command<'static>) -> Command<'static> {
    command
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .help("Directory the PDF is written to")
                .value_name("DIR")
                .takes_value(true),
        )
        .arg(
            Arg::new("base url")
                .long("base-url")
                .help("Public address of the output directory")
                .value_name("URL")
                .takes_value(true),
        )
}

fn number_arg() -> Arg<'static> {
    Arg::new("number")
        .short('n')
        .long("number")
        .help("Document number")
        .value_name("NUMBER")
        .takes_value(true)
        .required(true)
}

fn today_arg() -> Arg<'static> {
    Arg::new("today")
        .long("today")
        .help("Date to evaluate at, defaults to today")
        .value_name("DATE")
        .takes_value(true)
}

#[async_std::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = Command::new("Walaka")
        .version("0.1.0")
        .author("WALAKA <info@walaka.co.mz>")
        .about("Invoices, receipts and subscriptions for small businesses")
        .arg(
            Arg::new("records")
                .short('r')
                .long("records")
                .help("Sets directory or file of invoice and receipt records or '-' for stdin")
                .value_name("DIR")
                .default_value("./")
                .takes_value(true),
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .help("Business settings file")
                .value_name("FILE")
                .takes_value(true),
        )
        .subcommand(
            Command::new("invoice")
                .about("Renders an invoice as a self-contained HTML document")
                .arg(number_arg())
                .arg(
                    Arg::new("template")
                        .short('t')
                        .long("template")
                        .help("Template overriding the settings, classic or modern")
                        .value_name("TEMPLATE")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("html")
                        .short('o')
                        .long("out")
                        .help("File the HTML is written to instead of stdout")
                        .value_name("FILE")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("totals")
                .about("Shows the rows and totals of an invoice")
                .arg(number_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Lists what keeps invoices from being issued")
                .arg(
                    Arg::new("number")
                        .short('n')
                        .long("number")
                        .help("Only this invoice")
                        .value_name("NUMBER")
                        .takes_value(true),
                ),
        )
        .subcommand(out_args(
            Command::new("receipt")
                .about("Generates the PDF of a receipt")
                .arg(number_arg())
                .arg(
                    Arg::new("draw")
                        .long("draw")
                        .help("Print the drawing commands as json instead"),
                ),
        ))
        .subcommand(
            Command::new("next-number")
                .about("Shows the next free document number")
                .arg(
                    Arg::new("prefix")
                        .short('p')
                        .long("prefix")
                        .help("Number prefix, defaults to the invoice prefix of the settings")
                        .value_name("PREFIX")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("year")
                        .short('y')
                        .long("year")
                        .help("Year, defaults to the current one")
                        .value_name("YEAR")
                        .takes_value(true),
                ),
        )
        .subcommand(
            Command::new("metrics")
                .about("Shows dashboard metrics as json")
                .arg(today_arg()),
        )
        .subcommand(
            Command::new("plans").about("Lists the plans").arg(
                Arg::new("language")
                    .short('l')
                    .long("language")
                    .help("en or pt")
                    .value_name("LANGUAGE")
                    .takes_value(true),
            ),
        )
        .subcommand(
            Command::new("trial")
                .about("Shows the trial status of the account")
                .arg(
                    Arg::new("started")
                        .long("started")
                        .help("Day the account was created")
                        .value_name("DATE")
                        .takes_value(true)
                        .required(true),
                )
                .arg(today_arg()),
        )
        .subcommand(out_args(
            Command::new("subscribe")
                .about("Pays for a plan and issues its invoice-receipt")
                .arg(
                    Arg::new("plan")
                        .short('p')
                        .long("plan")
                        .help("basic or standard")
                        .value_name("PLAN")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("method")
                        .short('m')
                        .long("method")
                        .help("transfer, mpesa or emola")
                        .value_name("METHOD")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::new("start")
                        .long("start")
                        .help("First day of the subscription, defaults to today")
                        .value_name("DATE")
                        .takes_value(true),
                ),
        ))
        .get_matches();

    let settings = match matches.value_of("settings") {
        Some(file) => Settings::from_file(file).await?,
        None => Settings::default(),
    };
    let records = match matches.value_of("records") {
        Some("-") | None => Records::new(None, settings),
        Some(path) => Records::new(Some(path), settings),
    };

    if let Some(invoice) = matches.subcommand_matches("invoice") {
        let number = invoice.value_of("number").context("Number required")?;
        let data = records.invoice_data(number).await?;
        let template = match invoice.value_of("template") {
            Some(key) => select_template_with_accent(key, records.settings.invoice.accent_color.as_deref()),
            None => records.settings.template(),
        };
        let html = populate(&template, &data);
        match invoice.value_of("html") {
            Some(file) => {
                fs::write(file, html)
                    .await
                    .with_context(|| format!("Failed to write {}", file))?;
                info!("Wrote {}", file);
            }
            None => println!("{}", html),
        }
    } else if let Some(totals) = matches.subcommand_matches("totals") {
        let number = totals.value_of("number").context("Number required")?;
        let data = records.invoice_data(number).await?;
        let document = InvoiceDocument::new(&data);
        let currency = &data.invoice.currency;
        let amt_pad = 12;
        for item in document.pages().concat() {
            let amounts = item.amounts();
            println!(
                "{:32} | {:>6} | {} | {:>10} | {} | {} | {}",
                item.description,
                item.quantity.normalize(),
                item.unit_price.to_row_string(amt_pad),
                discount_display(item, currency),
                amounts.discounted_subtotal.to_row_string(amt_pad),
                amounts.vat_amount.to_row_string(amt_pad),
                amounts.line_total.to_row_string(amt_pad),
            );
        }
        let totals = &document.totals;
        for (label, amount) in [
            ("Subtotal", totals.subtotal),
            ("Discount", totals.total_discount),
            ("Subtotal after Discount", totals.subtotal_after_discount),
            ("VAT", totals.total_vat),
            ("Total", totals.grand_total),
        ] {
            println!("{:32} | {}", label, currency.format(amount));
        }
    } else if let Some(validation) = matches.subcommand_matches("validate") {
        let invoices = match validation.value_of("number") {
            Some(number) => vec![records.invoice(number).await?],
            None => records.invoices().await?,
        };
        let mut failed = 0;
        for invoice in invoices {
            let data = invoice.into_data(&records.settings);
            let problems = validate(&data);
            let number = data.invoice.display_number("(no number)");
            if problems.is_empty() {
                println!("{}: ok", number);
            } else {
                failed += 1;
                println!("{}:\n{}", number, problems.iter().map(|p| format!("  - {}", p)).join("\n"));
            }
        }
        if failed > 0 {
            bail!("{} invoice(s) cannot be issued", failed);
        }
    } else if let Some(receipt) = matches.subcommand_matches("receipt") {
        let number = receipt.value_of("number").context("Number required")?;
        let document = records.receipt(number).await?;
        let ops = document.layout();
        if receipt.is_present("draw") {
            println!("{}", serde_json::to_string_pretty(&ops)?);
        } else {
            let renderer = PrintPdf::new(document.title());
            let location = publish(&renderer, &store(receipt), &document.number, RenderInput::Draw(&ops)).await?;
            println!("{}", location);
        }
    } else if let Some(next) = matches.subcommand_matches("next-number") {
        let prefix = next
            .value_of("prefix")
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| records.settings.invoice.prefix.clone());
        let year = match next.value_of("year") {
            Some(year) => year.parse().with_context(|| format!("Bad year '{}'", year))?,
            None => Local::now().year(),
        };
        println!("{}", next_number_from(&records, &prefix, year).await);
    } else if let Some(metrics) = matches.subcommand_matches("metrics") {
        let today = date_arg(metrics, "today")?;
        let default_vat_rate = records.settings.invoice.default_vat_rate;
        let summaries: Vec<InvoiceSummary> = records
            .invoices()
            .await?
            .iter()
            .map(|invoice| InvoiceSummary::from_raw(invoice, default_vat_rate))
            .collect();
        let dashboard = Dashboard::new(&summaries, today);
        let week: Vec<String> = WEEKDAYS
            .iter()
            .zip(dashboard.this_week)
            .map(|(day, count)| format!("{} {}", day, count))
            .collect();
        info!("This week: {}", week.join(", "));
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else if let Some(plans) = matches.subcommand_matches("plans") {
        let language = plans.value_of("language").map(Language::from).unwrap_or_default();
        for plan in PLANS.iter() {
            let recommended = if plan.recommended { " *" } else { "" };
            println!(
                "{:10} | {:12} | {} user(s) | {}{}",
                plan.name(language),
                plan.price,
                plan.max_users,
                plan.features.join(", "),
                recommended
            );
        }
    } else if let Some(trial) = matches.subcommand_matches("trial") {
        let started = date_arg(trial, "started")?;
        let today = date_arg(trial, "today")?;
        let invoice_count = records.invoices().await?.len();
        let subscriptions = records.subscriptions().await?;
        let status = trial_status(started, today, invoice_count, &subscriptions);
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if let Some(subscription) = matches.subcommand_matches("subscribe") {
        let plan = subscription.value_of("plan").context("Plan required")?.parse()?;
        let method = subscription.value_of("method").context("Method required")?.parse()?;
        let start = date_arg(subscription, "start")?;
        let number = next_number_from(&records, SUBSCRIPTION_PREFIX, start.year()).await;
        let subscribed = subscribe(plan, method, start, &number)?;
        let document = subscribed.receipt(vendor(), records.settings.company.clone());
        let ops = document.layout();
        let location = publish(
            &PrintPdf::new(document.title()),
            &store(subscription),
            &document.number,
            RenderInput::Draw(&ops),
        )
        .await?;
        info!("{}", subscribed.notice());
        info!("Invoice-receipt at {}", location);
        // the record to keep with the others
        print!("{}", serde_yaml::to_string(&raw::Receipt::from(&document))?);
    }
    Ok(())
}
