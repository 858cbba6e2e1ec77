//! Brickfall headless runner
//!
//! Drives the simulation with a simple autopilot and logs what happens.
//! The browser build enters through `brickfall::wasm::WasmWorld` instead.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::Parser;

    use brickfall::consts::SIM_DT;
    use brickfall::sim::{GameEvent, GamePhase, TickInput, World, tick};
    use brickfall::{Catalog, Tuning, heading};

    #[derive(Parser, Debug)]
    #[command(about = "Run the Brickfall simulation headless with an autopilot", version)]
    struct Args {
        /// RNG seed for the run
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Ticks to simulate (60 per second)
        #[arg(long, default_value_t = 3600)]
        ticks: u64,
        #[arg(long, default_value_t = 800.0)]
        width: f32,
        #[arg(long, default_value_t = 600.0)]
        height: f32,
        /// Partial tuning JSON overriding the defaults
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Ball kind from the built-in catalog
        #[arg(long, default_value = "StarterBall")]
        ball: String,
    }

    /// Aim at whichever brick is closest to breaking through
    fn autopilot(world: &World) -> TickInput {
        let aim = world
            .bricks
            .iter()
            .filter(|b| b.is_live() && !b.is_immune())
            .max_by(|a, b| a.rect.bottom().total_cmp(&b.rect.bottom()))
            .map(|b| heading(b.center() - world.player.pos));
        TickInput {
            aim,
            shoot: true,
            ..Default::default()
        }
    }

    fn report(tick_no: u64, event: &GameEvent) {
        match event {
            GameEvent::BrickHit { .. } | GameEvent::BallLaunched { .. } => {
                log::debug!("[{tick_no}] {event:?}")
            }
            _ => log::info!("[{tick_no}] {event:?}"),
        }
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();

        let tuning = match &args.tuning {
            Some(path) => Tuning::load(path)?,
            None => Tuning::default(),
        };
        let catalog = Catalog::builtin();
        let kind = catalog.get(&args.ball).cloned().with_context(|| {
            let known: Vec<&str> = catalog.names().collect();
            format!("unknown ball kind {:?} (known: {})", args.ball, known.join(", "))
        })?;

        log::info!("Brickfall (native) starting...");
        let mut world = World::with_canvas(args.seed, tuning, args.width, args.height);
        world.set_loadout(kind);

        for tick_no in 0..args.ticks {
            let input = autopilot(&world);
            for event in tick(&mut world, &input, SIM_DT) {
                report(tick_no, &event);
            }
            if world.phase == GamePhase::GameOver {
                break;
            }
        }

        println!(
            "ticks={} level={} xp={} kills={} health={:.0}/{:.0} phase={:?}",
            world.time_ticks,
            world.progress.level,
            world.progress.xp,
            world.progress.kills,
            world.player.health,
            world.player.max_health,
            world.phase
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is WasmWorld, this is just to satisfy the compiler
}
