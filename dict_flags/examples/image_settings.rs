//! Example CLI demonstrating dict and auto flag groups.
//!
//! Try:
//!
//! ```text
//! cargo run --example image_settings -- \
//!     --image_settings.sizes.height=10 --nodata.shuffle
//! ```

use std::io::{self, Write};

use dict_flags::{AutoOptions, FlagSignature, Item, ItemTree, Registry};

#[derive(FlagSignature)]
struct DataSettings {
    dataset_name: String,
    batch_size: i64,
    shuffle: bool,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dataset_name: "mnist".to_owned(),
            batch_size: 128,
            shuffle: true,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::new();

    let image_settings = registry.define_dict(
        "image_settings",
        ItemTree::new()
            .with("mode", Item::string("pad"))?
            .with(
                "sizes",
                ItemTree::new()
                    .with("width", Item::integer(5))?
                    .with("height", Item::integer(7))?
                    .with("scale", Item::float(0.5))?,
            )?,
    )?;
    let data = registry.define_auto::<DataSettings>("data", &AutoOptions::new())?;

    registry.parse_from(std::env::args().skip(1))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "image_settings = {}", image_settings.value().to_json())?;
    writeln!(out, "data = {}", data.value().to_json())?;
    Ok(())
}
