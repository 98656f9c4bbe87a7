//! End-to-end test of the billing pipeline: configuration, loaders,
//! validation, rule evaluation, invoice assembly and output files.

use lentolasku::{
    assemble_invoices, load, output, rulebook, validation, BillingContext, Config, Engine,
    Invoice, PassReport,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const FLIGHTS_HEADER: &str = "Selite,Tapahtumapäivä,Maksajan viitenumero,Lähtöaika,Laskeutumisaika,Lentoaika_desimaalinen,Tarkoitus,Laskutuslisä syy";

fn fixture_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lentolasku-e2e-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn write_fixtures(dir: &Path) {
    write(dir, "valid_ids.txt", "# members\n1001\n2001\n");
    write(dir, "births.csv", "2001,01.05.2003\n");
    write(
        dir,
        "events.csv",
        "2024-01-01,1001,Saldo 2023,12.00,,2023,1\n\
         2024-03-01,1001,Vuosimaksu 2024,120.00\n\
         2024-05-01,POIS1,Ei laskuteta,10.00\n",
    );
    write(
        dir,
        "flights.csv",
        &format!(
            "{FLIGHTS_HEADER}\n\
             650,2024-06-15,1001,12:00,13:00,1.0,,\n\
             650 koulutus,2024-06-16,2001,10:00,11:00,1.0,,\n\
             TOW,2024-07-10,1001,09:00,09:06,0.1,,\n"
        ),
    );
    // one incoming 40.00 payment with reference 1001
    write(
        dir,
        "bank.nda",
        &format!(
            "T00{:<18}\n\
             T10{date}{date}{date}+{cents:018}{name:<35}{reference:0>20}\n",
            "FI2413093000112458",
            date = "240701",
            cents = 4000,
            name = "MEIKALAINEN MATTI",
            reference = "1001",
        ),
    );
    write(
        dir,
        "config.json",
        r#"{
            "event_files": ["events.csv"],
            "flight_files": ["flights.csv"],
            "nda_files": ["bank.nda"],
            "birth_date_files": ["births.csv"],
            "valid_id_files": ["valid_ids.txt"],
            "no_invoicing_prefix": ["pois"],
            "invoice_date": "2024-12-31",
            "out_dir": "out",
            "description": "PIK laskutus 2024",
            "context_file_out": "context.json",
            "bank_ibans": ["FI2413093000112458"]
        }"#,
    );
}

fn run_billing(config: &Config) -> (Vec<Invoice>, BillingContext, PassReport) {
    let mut ctx = load::load_context(config).unwrap();
    let metadata = load::load_metadata(config).unwrap();
    let events = load::load_events(config).unwrap();

    let engine = Engine::new(
        rulebook::rules_2024(&metadata),
        config.no_invoicing_prefix.clone(),
    );
    let (lines, report) = engine.run(&events, &mut ctx);
    (assemble_invoices(lines, config.invoice_date), ctx, report)
}

#[test]
fn full_run_produces_expected_outputs() {
    let dir = fixture_dir("full");
    write_fixtures(&dir);
    let config = Config::load(&dir.join("config.json")).unwrap();

    // validation flags only the no-invoicing row (prefix set holds exact
    // ids, and POIS1 is not one of them)
    let events = load::load_events(&config).unwrap();
    let known_ids = load::read_known_ids(&config.valid_id_files).unwrap();
    let external_ids: HashSet<String> =
        config.no_invoicing_prefix.iter().cloned().collect();
    let summary = validation::validate_events(&events, &known_ids, &external_ids);
    assert_eq!(summary.total_invalid(), 1);

    let (invoices, ctx, report) = run_billing(&config);

    // the prefixed account was skipped before rule evaluation
    assert!(report.skipped_accounts.contains("POIS1"));
    assert!(report.unmatched_event_ids.is_empty());

    assert_eq!(invoices.len(), 2);
    let member = &invoices[0];
    assert_eq!(member.account_id, "1001");
    // 12.00 balance + 120.00 fee + 18.00 glider hour + 10.00 equipment
    // + 30.50 minimum-billed tow + 1.00 equipment - 40.00 payment
    assert_eq!(member.total(), dec!(151.50));

    let youth = &invoices[1];
    assert_eq!(youth.account_id, "2001");
    // 13.50 discounted glider hour + 10.00 equipment fee
    assert_eq!(youth.total(), dec!(23.50));

    let descriptions: Vec<&str> = member
        .lines
        .iter()
        .map(|line| line.description.as_str())
        .collect();
    assert!(descriptions.contains(&"Lento, TOW, 15 min (minimilaskutus 15 min)"));
    assert!(descriptions.contains(&"MEIKALAINEN MATTI"));

    // equipment fee accumulated in the context for both accounts
    assert_eq!(ctx.amount("1001", "kalustomaksu_hintakatto_2024"), dec!(11));
    assert_eq!(ctx.amount("2001", "kalustomaksu_hintakatto_2024"), dec!(10));

    let (billable, zero) = output::write_outputs(&invoices, &config).unwrap();
    output::save_context(&ctx, &config).unwrap();
    assert_eq!(billable.len(), 2);
    assert!(zero.is_empty());

    let invoice_text = std::fs::read_to_string(config.out_dir.join("1001.txt")).unwrap();
    assert!(invoice_text.starts_with("PIK laskutus 2024"));
    assert!(invoice_text.contains("Vuosimaksu 2024"));
    assert!(invoice_text.contains("Aiemmat tapahtumat yhteensä"));
    assert!(invoice_text.contains("151.50"));

    let totals = std::fs::read_to_string(config.out_dir.join("totals.csv")).unwrap();
    assert!(totals.contains("1001,151.50"));
    assert!(totals.contains("2001,23.50"));

    let rows = std::fs::read_to_string(config.out_dir.join("rows_2024.csv")).unwrap();
    assert!(rows.contains("Lento, 650, 60 min"));
    // the carried-over balance is rollup and stays out of the ledger export
    assert!(!rows.contains("Saldo 2023"));
    assert!(!config.out_dir.join("rows_2023.csv").exists());
    assert!(!config.out_dir.join("POIS1.txt").exists());

    let saved = std::fs::read_to_string(dir.join("context.json")).unwrap();
    let reloaded = BillingContext::from_json(&saved).unwrap();
    assert_eq!(reloaded, ctx);
}

#[test]
fn running_twice_is_deterministic() {
    let dir = fixture_dir("determinism");
    write_fixtures(&dir);
    let config = Config::load(&dir.join("config.json")).unwrap();

    let (first_invoices, first_ctx, _) = run_billing(&config);
    let (second_invoices, second_ctx, _) = run_billing(&config);

    assert_eq!(first_ctx, second_ctx);
    assert_eq!(first_invoices.len(), second_invoices.len());
    for (a, b) in first_invoices.iter().zip(&second_invoices) {
        assert_eq!(a.account_id, b.account_id);
        assert_eq!(a.lines, b.lines);
    }
}

#[test]
fn saved_context_carries_caps_into_the_next_run() {
    let dir = fixture_dir("replay");
    write_fixtures(&dir);

    // seed the equipment-fee accumulator at its cap
    write(
        &dir,
        "context_in.json",
        r#"{"1001": {"kalustomaksu_hintakatto_2024": "90"}}"#,
    );
    let mut raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("config.json")).unwrap()).unwrap();
    raw["context_file_in"] = serde_json::json!("context_in.json");
    std::fs::write(dir.join("config.json"), raw.to_string()).unwrap();

    let config = Config::load(&dir.join("config.json")).unwrap();
    let (invoices, ctx, _) = run_billing(&config);

    // every further equipment fee for 1001 is zeroed at the cap
    let member = &invoices[0];
    let fees: Vec<_> = member
        .lines
        .iter()
        .filter(|line| line.description.starts_with("Kalustomaksu"))
        .collect();
    assert_eq!(fees.len(), 2);
    for fee in fees {
        assert_eq!(fee.amount, Decimal::ZERO);
        assert!(fee.description.ends_with("rajattu hintakattoon"));
    }
    assert_eq!(ctx.amount("1001", "kalustomaksu_hintakatto_2024"), dec!(90));
}
