use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo + 1) as f64) as i64
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.range(0, items.len() as i64 - 1) as usize]
    }
}

/// Per segment: (recency range, frequency range, spend per order range).
const SEGMENTS: [(&str, (i64, i64), (i64, i64), (f64, f64)); 5] = [
    ("Champions", (1, 20), (15, 40), (150.0, 400.0)),
    ("Loyal Customers", (10, 60), (8, 20), (100.0, 250.0)),
    ("Potential Loyalists", (5, 45), (2, 8), (60.0, 180.0)),
    ("At Risk", (90, 250), (4, 15), (80.0, 200.0)),
    ("Lost", (250, 600), (1, 3), (20.0, 90.0)),
];

const STATUSES: [&str; 4] = ["Paid", "Paid", "Pending", "Refunded"];
const TYPES: [&str; 3] = ["Retail", "Wholesale", "Online"];

fn write_rfm(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).context("creating RFM csv")?;
    writer.write_record(["Unnamed: 0", "Recency", "Frequency", "Monetary", "Segment"])?;

    let mut n = 0;
    for (segment, (r_lo, r_hi), (f_lo, f_hi), (m_lo, m_hi)) in SEGMENTS {
        for _ in 0..40 {
            let recency = rng.range(r_lo, r_hi);
            let frequency = rng.range(f_lo, f_hi);
            let per_order = m_lo + rng.next_f64() * (m_hi - m_lo);
            let monetary = (frequency as f64 * per_order * 100.0).round() / 100.0;
            writer.write_record([
                n.to_string(),
                recency.to_string(),
                frequency.to_string(),
                monetary.to_string(),
                segment.to_string(),
            ])?;
            n += 1;
        }
    }
    writer.flush()?;
    Ok(n)
}

fn write_sales(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).context("invalid start date")?;
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid epoch")?;
    let n_rows: usize = 600;

    let mut ids = Vec::with_capacity(n_rows);
    let mut dates = Vec::with_capacity(n_rows);
    let mut statuses = Vec::with_capacity(n_rows);
    let mut types = Vec::with_capacity(n_rows);
    let mut prices = Vec::with_capacity(n_rows);
    let mut branches = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        let date = start + Duration::days(rng.range(0, 3 * 365 - 1));
        let status = rng.pick(&STATUSES);
        let amount = (rng.range(1_000, 250_000) as f64) / 100.0;
        let price = if status == "Refunded" { -amount } else { amount };

        ids.push(i as i64);
        dates.push((date - epoch).num_days() as i32);
        statuses.push(status);
        types.push(rng.pick(&TYPES));
        prices.push(price);
        branches.push("Dammam");
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("#", DataType::Int64, false),
        Field::new("Date", DataType::Date32, false),
        Field::new("Status", DataType::Utf8, false),
        Field::new("Type", DataType::Utf8, false),
        Field::new("Net Price", DataType::Float64, false),
        Field::new("Branch", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(StringArray::from(statuses)),
            Arc::new(StringArray::from(types)),
            Arc::new(Float64Array::from(prices)),
            Arc::new(StringArray::from(branches)),
        ],
    )
    .context("building sales record batch")?;

    let file = std::fs::File::create(path).context("creating sales parquet")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(n_rows)
}

fn main() -> Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| ".".to_string()));
    let mut rng = SimpleRng::new(42);

    let rfm_path = out_dir.join("rfm_analysis.csv");
    let n_customers = write_rfm(&rfm_path, &mut rng)?;

    let sales_path = out_dir.join("sales.parquet");
    let n_sales = write_sales(&sales_path, &mut rng)?;

    println!(
        "Wrote {n_customers} customers to {} and {n_sales} transactions to {}",
        rfm_path.display(),
        sales_path.display()
    );
    Ok(())
}
