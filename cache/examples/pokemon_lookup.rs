use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use suspense_cache::{CacheBuilder, CacheConfig, Probe};
use tokio::time::{sleep, Duration};

#[derive(Debug)]
struct Pokemon {
  name: String,
  number: u32,
}

// A simulated slow pokedex service.
async fn fetch_pokemon(name: String, fetch_count: Arc<AtomicUsize>) -> Result<Pokemon, String> {
  println!("--- Pokedex: looking up '{}'...", name);
  fetch_count.fetch_add(1, Ordering::SeqCst);
  sleep(Duration::from_millis(300)).await;
  let number = match name.as_str() {
    "bulbasaur" => 1,
    "pikachu" => 25,
    "mew" => 151,
    _ => return Err(format!("unsupported pokemon: {}", name)),
  };
  println!("--- Pokedex: found '{}' (#{:03}).", name, number);
  Ok(Pokemon { name, number })
}

#[tokio::main]
async fn main() {
  let fetch_count = Arc::new(AtomicUsize::new(0));

  let cache = Arc::new(
    CacheBuilder::from_config(CacheConfig::new(1_000, 100).expect("valid config"))
      .fetcher({
        let counter = fetch_count.clone();
        move |name: String| fetch_pokemon(name, counter.clone())
      })
      .build()
      .expect("Failed to build resource cache"),
  );

  println!("--- Probe and Suspend ---");
  let resource = cache.resource("pikachu").unwrap();
  let pikachu = loop {
    match resource.probe().unwrap() {
      Probe::Pending(settled) => {
        println!("pikachu is still loading, suspending...");
        settled.await;
      }
      Probe::Ready(pokemon) => break pokemon,
      Probe::Failed(error) => panic!("{}", error),
    }
  };
  println!("Got {} #{:03}\n", pikachu.name, pikachu.number);

  println!("--- Shared In-Flight Fetch ---");
  let mut tasks = Vec::new();
  for i in 0..5 {
    let cache = cache.clone();
    tasks.push(tokio::spawn(async move {
      let outcome = cache.resource("mew").unwrap().resolve().await.unwrap();
      println!("[Task {}] mew resolved: {:?}", i, outcome.into_result().map(|p| p.number));
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  println!("\n--- Failures Are Cached Too ---");
  for _ in 0..2 {
    let outcome = cache.resource("missingno").unwrap().resolve().await.unwrap();
    println!("missingno: {:?}", outcome.into_result().map(|p| p.number));
  }

  println!("\n--- Expiry ---");
  sleep(Duration::from_millis(1_200)).await;
  println!("Entries after the ttl passed: {}", cache.len());
  let again = cache.resource("pikachu").unwrap();
  println!(
    "Requesting pikachu again starts a new fetch (pending: {})",
    again.probe().unwrap().is_pending()
  );
  again.resolve().await.unwrap();

  println!(
    "\nPokedex was called {} time(s) in total.",
    fetch_count.load(Ordering::SeqCst)
  );
  println!("Cache metrics: {:#?}", cache.metrics());

  if let Ok(cache) = Arc::try_unwrap(cache) {
    cache.shutdown();
  }
}
