use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arbor_core::{
    AsComponent, Callback, Component, DeferredCallback, DirectCallback, ReactorConfig, Root,
    RootBuilder, Timer,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DemoConfig {
    main: ReactorConfig,
    worker: ReactorConfig,
    ticks: u32,
    period_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            main: ReactorConfig {
                name: "main".to_string(),
                ..ReactorConfig::default()
            },
            worker: ReactorConfig {
                name: "ticker".to_string(),
                ..ReactorConfig::default()
            },
            ticks: 5,
            period_ms: 200,
        }
    }
}

impl DemoConfig {
    fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        if config.ticks == 0 {
            return Err("`ticks` must be at least 1".into());
        }
        Ok(config)
    }
}

/// Lives on the branch thread. Rearms its timer until `limit` ticks went out.
struct Ticker {
    timer: Timer,
    // timer より後に破棄される
    component: Component,
}

impl Ticker {
    fn new(parent: &Component, period: Duration, limit: u32, on_tick: Callback<u32>) -> Self {
        let component = Component::new(parent);
        let sent = AtomicU32::new(0);
        let timer = Timer::new(
            &component,
            period,
            DirectCallback::new(move |timer: Timer| {
                let tick = sent.fetch_add(1, Ordering::Relaxed) + 1;
                if let Err(err) = on_tick.call(tick) {
                    warn!(tick, %err, "tick was not delivered");
                }
                if tick < limit {
                    timer.start();
                }
            }),
        );
        Self { timer, component }
    }

    fn start(&self) {
        self.timer.start();
    }
}

impl AsComponent for Ticker {
    fn as_component(&self) -> &Component {
        &self.component
    }
}

/// Lives on the main thread. Stops the main reactor once every tick arrived.
struct Collector {
    expected: u32,
    received: Mutex<Vec<u32>>,
    component: Component,
}

impl Collector {
    fn new(parent: &Root, expected: u32) -> Self {
        Self {
            expected,
            received: Mutex::new(Vec::new()),
            component: Component::new(parent),
        }
    }

    fn on_tick(&self, tick: u32) {
        let mut received = self
            .received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        received.push(tick);
        info!(tick, thread = ?std::thread::current().name(), "tick received");

        if received.len() >= self.expected as usize {
            self.component.context().stop();
        }
    }

    fn received(&self) -> Vec<u32> {
        self.received
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl AsComponent for Collector {
    fn as_component(&self) -> &Component {
        &self.component
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // (A) 設定を読む（引数がなければデフォルト）
    let config = match std::env::args().nth(1) {
        Some(path) => DemoConfig::load(&path)?,
        None => DemoConfig::default(),
    };
    info!(?config, "starting demo");

    // (B) main スレッドの Root と、tick を受け取る Collector
    let main = RootBuilder::from_config(config.main).build()?;
    let collector = Arc::new(Collector::new(&main, config.ticks));
    let on_tick: Callback<u32> = DeferredCallback::bind(&collector, Collector::on_tick).into();

    // (C) 別スレッドの Branch に Ticker を載せて起動
    let period = Duration::from_millis(config.period_ms);
    let branch = RootBuilder::from_config(config.worker)
        .build_branch_with_parent(&main, |parent| {
            Ticker::new(parent, period, config.ticks, on_tick)
        })?;
    branch.run()?;
    branch.post(Ticker::start);

    // (D) Collector が main を止めるまでブロック
    main.run();

    // (E) Branch を止めて join してから結果を出す
    branch.join();
    info!(received = ?collector.received(), "demo finished");
    Ok(())
}
