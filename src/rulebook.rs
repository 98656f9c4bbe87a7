use crate::filters::Filter;
use crate::load::Metadata;
use crate::period::Period;
use crate::rules::{
    AllRules, CappedRule, FirstRule, FlightRule, MinimumDurationRule, Pricer, Rule,
    SetLedgerYearRule, SimpleRule, DEFAULT_FLIGHT_TEMPLATE,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// Ledger accounts of the 2024 books.
const ACCT_PURSI_KEIKKA: i32 = 3220;
const ACCT_TOW: i32 = 3130;
const ACCT_1037: i32 = 3150;
const ACCT_1037_OPEALE: i32 = 3150;
const ACCT_TOWING: i32 = 3170;
const ACCT_PURSI_INSTRUCTION: i32 = 3470;
const ACCT_KALUSTO: i32 = 3010;
const ACCT_LASKUTUSLISA: i32 = 3610;

const YOUTH_MAX_AGE: u32 = 25;
const YOUTH_DISCOUNT: Decimal = dec!(0.75);
const MIN_MOTOR_MINUTES: Decimal = dec!(15);
const MIN_MOTOR_TEXT: &str = "(minimilaskutus 15 min)";

fn aircraft(registration: &str) -> Filter {
    Filter::Aircraft(vec![registration.to_string()])
}

fn hourly(rate: Decimal, ledger: i32, filters: Vec<Filter>, template: &str) -> Box<dyn Rule> {
    Box::new(FlightRule::with_template(
        Pricer::Hourly(rate),
        ledger,
        filters,
        template,
    ))
}

fn min_duration(inner: Box<dyn Rule>, motor: &Filter) -> Box<dyn Rule> {
    Box::new(MinimumDurationRule::new(
        inner,
        vec![motor.clone()],
        MIN_MOTOR_MINUTES,
        MIN_MOTOR_TEXT,
    ))
}

/// Discount tiers for one glider: youth price, course-member price, list
/// price. `FirstRule` keeps only the best applicable tier.
fn glider_tiers(
    rate: Decimal,
    registration: &str,
    season: &Filter,
    youth: &Filter,
    course: &Filter,
) -> Box<dyn Rule> {
    Box::new(FirstRule::new(vec![
        hourly(
            rate * YOUTH_DISCOUNT,
            ACCT_PURSI_KEIKKA,
            vec![season.clone(), aircraft(registration), youth.clone()],
            "Lento (nuorisoalennus), {aircraft}, {duration} min",
        ),
        hourly(
            rate * YOUTH_DISCOUNT,
            ACCT_PURSI_KEIKKA,
            vec![season.clone(), aircraft(registration), course.clone()],
            "Lento (kurssialennus), {aircraft}, {duration} min",
        ),
        hourly(
            rate,
            ACCT_PURSI_KEIKKA,
            vec![season.clone(), aircraft(registration)],
            DEFAULT_FLIGHT_TEMPLATE,
        ),
    ]))
}

/// The 2024 rule tree.
///
/// Everything is wrapped in one `SetLedgerYearRule` so each line lands in
/// the 2024 books unless its source event says otherwise.
pub fn rules_2024(metadata: &Metadata) -> Vec<Box<dyn Rule>> {
    let year = 2024;
    let motor_period = Filter::Period(Period::new(
        NaiveDate::from_ymd_opt(year, 1, 28).expect("valid date"),
        NaiveDate::from_ymd_opt(year, 10, 27).expect("valid date"),
    ));
    let full_year = Filter::Period(Period::full_year(year));

    let pursi_cap_id = format!("pursi_hintakatto_{}", year);
    let kalustomaksu_cap_id = format!("kalustomaksu_hintakatto_{}", year);

    let youth = Filter::BirthDate {
        birth_dates: metadata.birth_dates.clone(),
        max_age_years: YOUTH_MAX_AGE,
    };
    let course = Filter::MemberList {
        members: metadata.course_members.clone(),
        whitelist: true,
    };

    let motor = Filter::any_of(vec![vec![
        aircraft("TOW"),
        aircraft("1037"),
        aircraft("1037-OPEALE"),
    ]]);
    // fleet and list prices per hour
    let gliders: [(&str, Decimal); 6] = [
        ("650", dec!(18)),
        ("787", dec!(26)),
        ("733", dec!(28)),
        ("1035", dec!(29)),
        ("883", dec!(36)),
        ("952", dec!(44)),
    ];
    let glider = Filter::any_of(vec![gliders
        .iter()
        .map(|&(registration, _)| aircraft(registration))
        .collect()]);
    let any_aircraft = Filter::any_of(vec![vec![motor.clone(), glider.clone()]]);

    let tow_rate = dec!(122);
    let motor_1037_rate = dec!(113);
    let opeale_rate = dec!(65);

    let mut rules: Vec<Box<dyn Rule>> = Vec::new();

    // OH-TOW: transfer tows and youth discount resolve before list price
    rules.push(Box::new(FirstRule::new(vec![
        min_duration(
            hourly(
                tow_rate * YOUTH_DISCOUNT,
                ACCT_TOWING,
                vec![
                    aircraft("TOW"),
                    motor_period.clone(),
                    Filter::TransferTow,
                    youth.clone(),
                ],
                "Siirtohinaus, TOW (nuorisoalennus), {duration} min",
            ),
            &motor,
        ),
        min_duration(
            hourly(
                tow_rate * YOUTH_DISCOUNT,
                ACCT_TOW,
                vec![aircraft("TOW"), motor_period.clone(), youth.clone()],
                "Lento, TOW (nuorisoalennus), {duration} min",
            ),
            &motor,
        ),
        min_duration(
            hourly(
                tow_rate,
                ACCT_TOWING,
                vec![aircraft("TOW"), motor_period.clone(), Filter::TransferTow],
                "Siirtohinaus, TOW, {duration} min",
            ),
            &motor,
        ),
        min_duration(
            hourly(
                tow_rate,
                ACCT_TOW,
                vec![aircraft("TOW"), motor_period.clone()],
                "Lento, TOW, {duration} min",
            ),
            &motor,
        ),
    ])));

    // OH-1037
    rules.push(Box::new(FirstRule::new(vec![
        min_duration(
            hourly(
                motor_1037_rate * YOUTH_DISCOUNT,
                ACCT_1037,
                vec![aircraft("1037"), motor_period.clone(), youth.clone()],
                "Lento, 1037 (nuorisoalennus), {duration} min",
            ),
            &motor,
        ),
        min_duration(
            hourly(
                motor_1037_rate,
                ACCT_1037,
                vec![aircraft("1037"), motor_period.clone()],
                "Lento, 1037, {duration} min",
            ),
            &motor,
        ),
    ])));

    // OH-1037 with the instructor discount
    rules.push(hourly(
        opeale_rate,
        ACCT_1037_OPEALE,
        vec![aircraft("1037-OPEALE"), motor_period.clone()],
        "Lento (opealennus), {duration} min",
    ));

    // glider hours under the annual price cap
    rules.push(Box::new(CappedRule::new(
        &pursi_cap_id,
        dec!(1250),
        Box::new(AllRules::new(
            gliders
                .iter()
                .map(|&(registration, rate)| {
                    glider_tiers(rate, registration, &full_year, &youth, &course)
                })
                .collect(),
        )),
    )));

    // instruction fee per training flight
    rules.push(Box::new(FlightRule::with_template(
        Pricer::PerLine(|_| dec!(6)),
        ACCT_PURSI_INSTRUCTION,
        vec![
            glider.clone(),
            full_year.clone(),
            Filter::Purpose(vec!["KOU".to_string()]),
        ],
        "Koululentomaksu, {aircraft}",
    )));

    // equipment fee on every flight, capped per year
    rules.push(Box::new(CappedRule::new(
        &kalustomaksu_cap_id,
        dec!(90),
        Box::new(AllRules::new(vec![
            hourly(
                dec!(10),
                ACCT_KALUSTO,
                vec![full_year.clone(), glider.clone()],
                "Kalustomaksu, {aircraft}, {duration} min",
            ),
            hourly(
                dec!(10),
                ACCT_KALUSTO,
                vec![full_year.clone(), motor.clone()],
                "Kalustomaksu, {aircraft}, {duration} min",
            ),
        ])),
    )));

    // manual ledger items and bank payments pass through as-is
    rules.push(Box::new(FirstRule::new(vec![
        Box::new(SimpleRule::new(vec![
            full_year.clone(),
            Filter::PositiveAmount,
        ])),
        Box::new(SimpleRule::new(vec![
            full_year.clone(),
            Filter::NegativeAmount,
        ])),
    ])));

    // surcharge for flights needing manual invoicing work
    rules.push(Box::new(FlightRule::with_template(
        Pricer::PerLine(|_| dec!(2)),
        ACCT_LASKUTUSLISA,
        vec![any_aircraft, full_year, Filter::InvoicingCharge],
        "Laskutuslisä, {aircraft}, {invoicing_comment}",
    )));

    vec![Box::new(SetLedgerYearRule::new(
        Box::new(AllRules::new(rules)),
        year,
    ))]
}
