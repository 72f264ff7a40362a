//! Chunked Calls Walkthrough
//!
//! Run with:
//!   cargo run --example chunked_calls
//!   RUST_LOG=callchain=debug cargo run --example chunked_calls
//!
//! Builds a chain that unrolls a list of running sums, doubles each value,
//! drops negatives, turns the rest into upper-case labels and keeps the
//! first five of them. A tap along the way plays the part of a socket.

use callchain::prelude::*;
use tracing_subscriber::EnvFilter;

/// End point of the chain: prints whatever arrives.
struct Printer;

impl Receiver<String> for Printer {
    fn on_receive(&mut self, item: String) {
        println!("#receive: {item}");
    }

    fn on_error(&mut self, cause: &Error) {
        println!("#error: {cause}");
    }

    fn on_complete(&mut self) {
        println!("#complete");
    }

    fn receiver_name(&self) -> &'static str {
        "printer"
    }
}

/// Running sums of `count` consecutive integers starting at `start`.
fn running_sums(start: i32, count: i32) -> Vec<i32> {
    (start..start + count)
        .scan(0, |sum, k| {
            *sum += k;
            Some(*sum)
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🔗 Chunked calls demo\n");

    let mut chain = Chain::<()>::with_config(ChainConfig::new().name("chunked_calls"));
    chain
        .just(running_sums(-2, 10))?
        .flat_map()
        .map(|x| x + x)
        .filter(|x| *x >= 0)
        .map(|x| format!("item {x}"))
        .catch_data(|item| println!("send to socket: {item}"))
        .map(|item| item.to_uppercase())
        .map(|item| item.replace("100", "777"))
        .take(5)
        .catch_complete(|| println!("we are done!"))
        .receiver(Printer);

    chain.start()?;

    println!("\n📊 Final stage states:");
    for (index, state) in chain.states().iter().enumerate() {
        println!("   {index:>2}: {state}");
    }
    Ok(())
}
