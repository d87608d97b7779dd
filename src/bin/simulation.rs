//! Broiler batch simulation
//!
//! Generates a synthetic dataset for one batch: hourly shed readings,
//! consumption logs, feed deliveries, weekly weighings, daily mortality,
//! a final individual weighing and a daily thermal map. Weights follow the
//! configured growth curve with noise; a few heat spikes trip the alerts.
//!
//! # Usage
//! ```bash
//! ./simulation --days 35 --seed 7 > lote.json
//! ./avicola-monitor report --dataset lote.json --batch lote-1 --date 2024-03-30
//! ```

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, Poisson};
use tracing::info;

use avicola_monitor::config::defaults::{SIMULATION_DAYS, SIMULATION_INITIAL_BIRDS, SIMULATION_WEIGHED_BIRDS};
use avicola_monitor::types::{
    Batch, BatchStatus, ConsumptionRecord, EnvironmentalReading, FeedType, FeedingRecord,
    GrowthRecord, HealthState, IndividualBird, MortalityRecord, ThermalMap,
};
use avicola_monitor::{Dataset, GompertzCurve};

// ============================================================================
// Shed Constants
// ============================================================================

/// Brooding temperature on day 1 (°C)
const BROODING_TEMP: f64 = 33.0;
/// Finishing temperature reached by day 28 (°C)
const FINISHING_TEMP: f64 = 21.0;
/// Peak-to-mean daily temperature swing (°C)
const DAILY_SWING: f64 = 2.0;
/// Baseline relative humidity (%)
const BASE_HUMIDITY: f64 = 62.0;
/// Water drunk per kg of feed
const WATER_FEED_RATIO: f64 = 1.8;
/// Expected daily deaths per 1000 birds
const DAILY_DEATHS_PER_1000: f64 = 0.8;
/// Chance that a given hour is a heat spike
const HEAT_SPIKE_PROBABILITY: f64 = 0.01;

const CAUSES: [&str; 4] = ["Ascitis", "Muerte súbita", "Problemas de patas", "Deshidratación"];
const ZONES: [&str; 9] = ["A1", "A2", "A3", "B1", "B2", "B3", "C1", "C2", "C3"];
const STAFF: [&str; 2] = ["Turno mañana", "Turno tarde"];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "simulation")]
#[command(about = "Synthetic broiler batch data for avicola-monitor")]
#[command(version = "1.0")]
struct Args {
    /// Batch length in days
    #[arg(short, long, default_value_t = SIMULATION_DAYS, value_parser = clap::value_parser!(u32).range(1..=70))]
    days: u32,

    /// Birds placed on day 1
    #[arg(short, long, default_value_t = SIMULATION_INITIAL_BIRDS)]
    birds: u32,

    /// Placement date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-03-01")]
    start: NaiveDate,

    /// Batch identifier
    #[arg(long, default_value = "lote-1")]
    batch_id: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,
}

// ============================================================================
// Simulation State
// ============================================================================

struct Simulation {
    rng: StdRng,
    curve: GompertzCurve,
    batch: Batch,
    living: u32,
    noise: Normal<f64>,
    weight_spread: Normal<f64>,
    dataset: Dataset,
}

impl Simulation {
    fn new(args: &Args) -> Result<Self> {
        let rng = match args.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let batch = Batch {
            id: args.batch_id.clone(),
            code: format!("L-{}", args.start.format("%y%m%d")),
            start_date: args.start,
            initial_count: args.birds,
            breed: "Cobb 500".to_string(),
            status: BatchStatus::Active,
        };

        Ok(Self {
            rng,
            curve: GompertzCurve::default(),
            living: args.birds,
            noise: Normal::new(0.0, 1.0)?,
            weight_spread: Normal::new(1.0, 0.03)?,
            dataset: Dataset { batches: vec![batch.clone()], ..Dataset::default() },
            batch,
        })
    }

    fn at(&self, day: NaiveDate, hour: u32) -> NaiveDateTime {
        day.and_hms_opt(hour, 0, 0).unwrap_or_else(|| day.and_time(chrono::NaiveTime::MIN))
    }

    /// Target shed temperature for an age, easing from brooding to finishing
    fn target_temperature(age: i64) -> f64 {
        let progress = ((age - 1) as f64 / 27.0).clamp(0.0, 1.0);
        BROODING_TEMP - (BROODING_TEMP - FINISHING_TEMP) * progress
    }

    fn simulate_day(&mut self, age: i64) -> Result<()> {
        let day = self.batch.start_date + Duration::days(age - 1);
        self.environment(day, age);
        self.consumption(day, age);
        self.feeding(day, age);
        self.mortality(day)?;
        if age % 7 == 0 {
            self.weighing(day, age);
        }
        self.thermal_map(day, age);
        Ok(())
    }

    fn environment(&mut self, day: NaiveDate, age: i64) {
        let target = Self::target_temperature(age);
        for hour in 0..24 {
            let phase = (f64::from(hour) - 9.0) / 24.0 * std::f64::consts::TAU;
            let mut temperature = target + DAILY_SWING * phase.sin() + 0.5 * self.noise.sample(&mut self.rng);
            if self.rng.gen_bool(HEAT_SPIKE_PROBABILITY) {
                temperature += 6.0;
            }
            let humidity = BASE_HUMIDITY - 2.0 * phase.sin() + 3.0 * self.noise.sample(&mut self.rng);
            // Gas builds up with bird mass
            let load = age as f64 / 42.0;
            let reading = EnvironmentalReading {
                batch_id: self.batch.id.clone(),
                recorded_at: self.at(day, hour),
                temperature_c: round1(temperature),
                humidity_pct: round1(humidity.clamp(20.0, 100.0)),
                co2_ppm: Some((900.0 + 1200.0 * load + 80.0 * self.noise.sample(&mut self.rng)).round()),
                ammonia_ppm: Some(round1((4.0 + 14.0 * load + self.noise.sample(&mut self.rng)).max(0.0))),
                illumination_lux: Some(if (5..23).contains(&hour) { 20.0 } else { 0.0 }),
                location: Some("Centro".to_string()),
                notes: None,
            };
            self.dataset.environmental.push(reading);
        }
    }

    /// Feed eaten per bird per day (kg), tracking body weight
    fn daily_intake_kg(&self, age: i64) -> f64 {
        0.012 + 0.09 * self.curve.ideal_weight(age as f64) / 1000.0
    }

    fn consumption(&mut self, day: NaiveDate, age: i64) {
        let daily_feed = self.daily_intake_kg(age) * f64::from(self.living);
        for hour in [6, 12, 18, 23] {
            let feed_kg = daily_feed / 4.0 * (1.0 + 0.05 * self.noise.sample(&mut self.rng));
            let record = ConsumptionRecord {
                batch_id: self.batch.id.clone(),
                recorded_at: self.at(day, hour),
                water_liters: round1(feed_kg * WATER_FEED_RATIO * (1.0 + 0.05 * self.noise.sample(&mut self.rng))),
                feed_kg: round1(feed_kg),
                feed_type: Some(FeedType::for_age(age)),
                waste_kg: Some(round1(feed_kg * 0.02)),
                electricity_kwh: Some(round1(12.0 + 2.0 * self.noise.sample(&mut self.rng).abs())),
            };
            self.dataset.consumption.push(record);
        }
    }

    fn feeding(&mut self, day: NaiveDate, age: i64) {
        let amount = self.daily_intake_kg(age) * f64::from(self.living) * 1.03;
        let responsible = STAFF[self.rng.gen_range(0..STAFF.len())];
        self.dataset.feeding.push(FeedingRecord {
            batch_id: self.batch.id.clone(),
            recorded_at: self.at(day, 7),
            feed_type: FeedType::for_age(age),
            amount_supplied_kg: amount.round(),
            supplied_at_hour: Some("07:30".to_string()),
            responsible_party: responsible.to_string(),
        });
    }

    fn mortality(&mut self, day: NaiveDate) -> Result<()> {
        let expected = f64::from(self.living) * DAILY_DEATHS_PER_1000 / 1000.0;
        if expected <= 0.0 {
            return Ok(());
        }
        let deaths = (Poisson::new(expected)?.sample(&mut self.rng) as u32).min(self.living);
        if deaths == 0 {
            return Ok(());
        }
        self.living -= deaths;

        let cause = CAUSES[self.rng.gen_range(0..CAUSES.len())];
        let zone = ZONES[self.rng.gen_range(0..ZONES.len())];
        self.dataset.mortality.push(MortalityRecord {
            batch_id: self.batch.id.clone(),
            date: day,
            count: deaths,
            cause: Some(cause.to_string()),
            notes: Some(format!("Zona: {}", zone)),
        });
        Ok(())
    }

    fn weighing(&mut self, day: NaiveDate, age: i64) {
        let weight = self.curve.ideal_weight(age as f64) * self.weight_spread.sample(&mut self.rng);
        let previous = self.dataset.growth.last().map(|g| (g.date, g.average_weight_g));
        let daily_gain = previous.map(|(date, w)| {
            let days = (day - date).num_days().max(1) as f64;
            round1((weight - w) / days)
        });
        self.dataset.growth.push(GrowthRecord {
            batch_id: self.batch.id.clone(),
            date: day,
            average_weight_g: weight.round(),
            daily_gain_g: daily_gain,
            uniformity_pct: Some(round1(82.0 + 4.0 * self.noise.sample(&mut self.rng)).clamp(0.0, 100.0)),
        });
    }

    fn thermal_map(&mut self, day: NaiveDate, age: i64) {
        let target = Self::target_temperature(age);
        let mut temperatures = Vec::with_capacity(3);
        for row in 0..3 {
            // Heaters sit along the first row
            let heater = if row == 0 { 1.5 } else { 0.0 };
            let mut cells = Vec::with_capacity(3);
            for col in 0..3 {
                let edge = if col == 1 { 0.0 } else { -0.5 };
                cells.push(round1(target + DAILY_SWING + heater + edge + 0.4 * self.noise.sample(&mut self.rng)));
            }
            temperatures.push(cells);
        }
        self.dataset.thermal_maps.push(ThermalMap {
            batch_id: self.batch.id.clone(),
            recorded_at: self.at(day, 14),
            temperatures,
        });
    }

    /// Individual weighing of a sample on the final day
    fn final_sample(&mut self, age: i64) -> Result<()> {
        let mean = self.curve.ideal_weight(age as f64);
        let spread = Normal::new(mean, mean * 0.1)?;
        for n in 1..=SIMULATION_WEIGHED_BIRDS {
            let weight = spread.sample(&mut self.rng).max(40.0);
            let health_state = match self.rng.gen_range(0..100) {
                0 => HealthState::Sick,
                1..=2 => HealthState::Recovering,
                _ => HealthState::Healthy,
            };
            self.dataset.birds.push(IndividualBird {
                batch_id: self.batch.id.clone(),
                identifier: format!("AV-{:03}", n),
                weight_g: weight.round(),
                health_state,
            });
        }
        Ok(())
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut sim = Simulation::new(&args)?;
    info!(
        batch = %sim.batch.id,
        days = args.days,
        birds = args.birds,
        seed = ?args.seed,
        "Simulating batch"
    );

    let last_age = i64::from(args.days);
    for age in 1..=last_age {
        sim.simulate_day(age)?;
    }
    sim.final_sample(last_age)?;

    info!(
        records = sim.dataset.record_count(),
        living = sim.living,
        "Simulation complete"
    );

    let json = sim.dataset.to_json_pretty().context("Failed to serialize dataset")?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{}", json)?;
    out.flush()?;
    Ok(())
}
