//! Scoring Request Producer
//!
//! Generates card transactions shaped like the training dataset and
//! publishes them as scoring requests to NATS for service testing.

use card_fraud_scorer::types::record::US_STATES;
use card_fraud_scorer::{RawTransactionRecord, ScoringRequest};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, NaiveDateTime, Utc};
use clap::Parser;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const CATEGORIES: [&str; 14] = [
    "gas_transport",
    "grocery_pos",
    "home",
    "shopping_pos",
    "kids_pets",
    "shopping_net",
    "entertainment",
    "food_dining",
    "personal_care",
    "health_fitness",
    "misc_pos",
    "misc_net",
    "grocery_net",
    "travel",
];

const MERCHANTS: [&str; 8] = [
    "fraud_Rippin, Kub and Mann",
    "fraud_Heller, Gutmann and Zieme",
    "fraud_Lind-Buckridge",
    "fraud_Kirlin and Sons",
    "fraud_Sporer-Keebler",
    "fraud_Haley Group",
    "fraud_Johnston-Casper",
    "fraud_Daugherty LLC",
];

const JOBS: [&str; 6] = [
    "Psychologist, counselling",
    "Special educational needs teacher",
    "Nature conservation officer",
    "Patent attorney",
    "Dance movement psychotherapist",
    "Transport planner",
];

const CITIES: [&str; 6] = [
    "Moravian Falls",
    "Orient",
    "Malad City",
    "Boulder",
    "Doe Hill",
    "Dublin",
];

#[derive(Parser)]
#[command(author, version, about = "Publish generated scoring requests", long_about = None)]
struct ProducerArgs {
    /// NATS server URL
    #[arg(long, default_value = "nats://localhost:4222")]
    url: String,

    /// Subject the scorer listens on
    #[arg(long, default_value = "scoring.requests")]
    subject: String,

    /// Number of requests to publish
    #[arg(long, default_value_t = 100)]
    count: u64,

    /// Share of suspicious transactions (0.0 - 1.0)
    #[arg(long, default_value_t = 0.1)]
    fraud_rate: f64,

    /// Delay between requests in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Model to request (the scorer's default when omitted)
    #[arg(long)]
    model: Option<String>,
}

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    request_counter: u64,
    model: Option<String>,
}

impl RequestGenerator {
    fn new(model: Option<String>) -> Self {
        Self {
            rng: rand::thread_rng(),
            request_counter: 0,
            model,
        }
    }

    fn generate(&mut self, suspicious: bool) -> ScoringRequest {
        self.request_counter += 1;
        let record = if suspicious {
            self.suspicious_record()
        } else {
            self.legitimate_record()
        };
        ScoringRequest {
            request_id: Some(format!("req_{:012}", self.request_counter)),
            model: self.model.clone(),
            record,
        }
    }

    /// Daytime purchase of an everyday amount
    fn legitimate_record(&mut self) -> RawTransactionRecord {
        let hour = self.rng.gen_range(7..22);
        let ts = self.timestamp(hour);
        let amt: f64 = self.rng.gen_range(1.0..200.0);
        let mut tx = self.base_record(ts, amt);
        tx.category = Some(self.random_choice(&CATEGORIES).to_string());
        tx
    }

    /// Large late-night online purchase
    fn suspicious_record(&mut self) -> RawTransactionRecord {
        let hour = self.rng.gen_range(0..4);
        let ts = self.timestamp(hour);
        let amt: f64 = self.rng.gen_range(500.0..1500.0);
        let mut tx = self.base_record(ts, amt);
        let category = self.random_choice(&["shopping_net", "misc_net", "grocery_pos"]);
        tx.category = Some(category.to_string());
        tx
    }

    fn base_record(&mut self, ts: NaiveDateTime, amt: f64) -> RawTransactionRecord {
        let cc_num = self
            .rng
            .gen_range(4_000_000_000_000_000u64..4_999_999_999_999_999)
            .to_string();
        let birth_year = ts.year() - self.rng.gen_range(18..85_i32);
        let dob = NaiveDate::from_ymd_opt(
            birth_year,
            self.rng.gen_range(1..=12),
            self.rng.gen_range(1..=28),
        )
        .unwrap_or(ts.date());

        let lat: f64 = self.rng.gen_range(25.0..49.0);
        let long: f64 = self.rng.gen_range(-124.0..-67.0);

        let mut tx = RawTransactionRecord::new(ts, cc_num, (amt * 100.0_f64).round() / 100.0, dob);
        tx.gender = Some(self.random_choice(&["F", "M"]).to_string());
        tx.job = Some(self.random_choice(&JOBS).to_string());
        tx.city = Some(self.random_choice(&CITIES).to_string());
        tx.state = Some(self.random_choice(&US_STATES).to_string());
        tx.zip = Some(format!("{:05}", self.rng.gen_range(1001..99950)));
        tx.city_pop = Some(self.rng.gen_range(100..3_000_000));
        tx.lat = Some(lat);
        tx.long = Some(long);
        tx.merchant = Some(self.random_choice(&MERCHANTS).to_string());
        tx.merch_lat = Some(lat + self.rng.gen_range(-1.0..1.0_f64));
        tx.merch_long = Some(long + self.rng.gen_range(-1.0..1.0_f64));
        tx
    }

    /// Today at `hour`, with random minutes and seconds
    fn timestamp(&mut self, hour: u32) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let minute = self.rng.gen_range(0..60);
        let second = self.rng.gen_range(0..60);
        now.date()
            .and_hms_opt(hour, minute, second)
            .unwrap_or(now - ChronoDuration::hours(1))
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    let args = ProducerArgs::parse();
    let fraud_rate = args.fraud_rate.clamp(0.0, 1.0);

    info!(
        nats_url = %args.url,
        subject = %args.subject,
        count = args.count,
        fraud_rate = fraud_rate,
        delay_ms = args.delay_ms,
        "Starting Scoring Request Producer"
    );

    let client = match async_nats::connect(args.url.as_str()).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&args, fraud_rate).await;
        }
    };

    let mut generator = RequestGenerator::new(args.model.clone());
    let mut rng = rand::thread_rng();

    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    for i in 0..args.count {
        let suspicious = rng.gen_bool(fraud_rate);
        if suspicious {
            suspicious_count += 1;
        } else {
            legitimate_count += 1;
        }

        let payload = serde_json::to_vec(&generator.generate(suspicious))?;
        client.publish(args.subject.clone(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} legitimate, {} suspicious)",
                i + 1,
                args.count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} requests ({} legitimate, {} suspicious)",
        args.count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(args: &ProducerArgs, fraud_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new(args.model.clone());
    let mut rng = rand::thread_rng();

    for i in 0..args.count {
        let request = generator.generate(rng.gen_bool(fraud_rate));
        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    Ok(())
}
