//! Blockchain Bridge: a thin façade translating external chain callbacks
//! into `OrdinalIndexCore`'s lifecycle calls.
//! Grounded on `chainhook-sdk::observer`'s `ObserverCommand`/`ObserverEvent`
//! enum-plus-channel shape, trimmed of the Bitcoin RPC/ZMQ machinery that
//! shape exists to serve — this bridge only ever needs the handful of
//! calls that drive the ordinal index's apply/rollback lifecycle.

#[macro_use]
extern crate ordinalindex_core;

use std::sync::Arc;
use std::thread::JoinHandle;

use hiro_system_kit::thread_named;
use ordinalindex_core::core::OrdinalIndexCore;
use ordinalindex_core::utils::Context;

pub use ordinalindex_core::core::{Block, PubkeyResolver, Transaction, TxId, UserField};

/// Commands the node pushes onto the bridge, one per OIC lifecycle call.
#[derive(Clone, Debug)]
pub enum BridgeCommand {
    StartReadFromDb(u64),
    ReadFromDb(Block),
    ReadFinished,
    RemoveBlock(Block),
    NewBlock(Block),
    Terminate,
}

/// Outcomes the bridge reports back, mirroring `ObserverEvent`'s
/// error/fatal/info/terminate shape.
#[derive(Clone, Debug)]
pub enum BridgeEvent {
    Error(String),
    Fatal(String),
    Info(String),
    Terminate,
}

/// Thread model: called on the node's block-applier thread, single
/// threaded relative to OIC.
pub struct Bridge {
    core: Arc<OrdinalIndexCore>,
    ctx: Context,
}

impl Bridge {
    pub fn new(core: Arc<OrdinalIndexCore>, ctx: Context) -> Bridge {
        Bridge { core, ctx }
    }

    pub fn on_start_read_from_db(&self, last_written: u64) -> Result<(), String> {
        self.core.on_start_read_from_db(last_written)
    }

    pub fn on_read_from_db(&self, block: &Block) -> Result<(), String> {
        self.core.on_read_from_db(block)
    }

    pub fn on_read_finished(&self) -> Result<(), String> {
        self.core.on_read_finished()
    }

    pub fn on_remove_block(&self, block: &Block) -> Result<(), String> {
        self.core.on_remove_block(block)
    }

    pub fn on_new_block(&self, block: &Block) -> Result<(), String> {
        self.core.on_new_block(block)
    }

    /// Spawns the apply-loop thread that drains `commands` and dispatches
    /// each to the matching OIC call, reporting outcomes on `events`. A
    /// storage failure is fatal to the loop; everything else keeps the
    /// loop running.
    pub fn spawn_apply_loop(
        self,
        commands: crossbeam_channel::Receiver<BridgeCommand>,
        events: crossbeam_channel::Sender<BridgeEvent>,
    ) -> JoinHandle<()> {
        thread_named("ordinal-index-apply")
            .spawn(move || {
                for command in commands.iter() {
                    let result = match command {
                        BridgeCommand::StartReadFromDb(last_written) => {
                            self.on_start_read_from_db(last_written)
                        }
                        BridgeCommand::ReadFromDb(block) => self.on_read_from_db(&block),
                        BridgeCommand::ReadFinished => self.on_read_finished(),
                        BridgeCommand::RemoveBlock(block) => self.on_remove_block(&block),
                        BridgeCommand::NewBlock(block) => self.on_new_block(&block),
                        BridgeCommand::Terminate => {
                            let _ = events.send(BridgeEvent::Terminate);
                            break;
                        }
                    };
                    if let Err(e) = result {
                        try_error!(self.ctx, "ordinal index storage failure: {}", e);
                        let _ = events.send(BridgeEvent::Fatal(e));
                        break;
                    }
                }
            })
            .expect("failed to spawn ordinal-index-apply thread")
    }
}
