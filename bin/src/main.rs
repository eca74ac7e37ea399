mod chain;
mod config;
mod persistence;

use std::path::PathBuf;

use alloy_primitives::{keccak256, B256, U256};
use anchorex_core::{
    calc_eip1559_config, commit_proposal, commit_verification, compute_basefee, deposit,
    from_twei, get_block_fee, get_proof_reward, AnchorInput, BlockEnv, BlockFee, ChainState,
    Eip1559Config, ExpCurve, L2Anchor, ProofReward, GOLDEN_TOUCH_ADDRESS, TWEI,
};
use anchorex_types::unix_now;
use clap::{Parser, Subcommand};
use eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    chain::{SimChain, SimToken},
    config::{
        FeeMarketParams, Preset, DEFAULT_CHAIN_ID, L2_BLOCK_TIME, L2_GENESIS_TIME, SIM_PROPOSER,
        SIM_PROVER,
    },
    persistence::{ChainStore, SqliteStore},
};

/// First L1 height the simulator reports as synced.
const SIM_L1_START: u64 = 18_000_000;

#[derive(Parser)]
#[command(name = "anchorex")]
#[command(about = "Fee market, tokenomics and block anchoring for an L2 canonical chain")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Derive an EIP-1559 curve config and print it as JSON
    CalcConfig {
        /// Target base fee at the curve's anchor point
        #[arg(long, default_value_t = 5_000_000_000)]
        basefee: u64,
        #[arg(long, default_value_t = 5_000_000)]
        gas_issued_per_second: u64,
        #[arg(long, default_value_t = 90_900_000_000)]
        max_gas_excess: u64,
        #[arg(long, default_value_t = 60_000_000)]
        gas_target: u64,
        /// Expected 2x/1x price ratio in basis points (defaults to the one the curve realises)
        #[arg(long)]
        ratio_2x1x: Option<u64>,
    },
    /// Compute the base fee and gas excess for the next block
    Basefee {
        #[arg(long, value_enum, default_value_t)]
        preset: Preset,
        /// Current gas excess (defaults to the preset's starting point)
        #[arg(long)]
        gas_excess: Option<u64>,
        #[arg(long, default_value_t = L2_BLOCK_TIME)]
        time_since_parent: u64,
        #[arg(long, default_value_t = 0)]
        parent_gas_used: u32,
    },
    /// Anchor blocks on a local simulated chain, persisting state after each one
    Simulate {
        #[arg(long, env = "ANCHOREX_DB", default_value = "anchorex.db")]
        db: PathBuf,
        #[arg(long, env = "ANCHOREX_CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
        chain_id: u64,
        #[arg(long, value_enum, default_value_t)]
        preset: Preset,
        /// Number of blocks to produce
        #[arg(long, default_value_t = 10)]
        blocks: u64,
        /// Gas every block uses
        #[arg(long, default_value_t = 30_000_000)]
        gas_used: u32,
        /// Blocks a proof trails its proposal by
        #[arg(long, default_value_t = 8)]
        proof_lag: u64,
    },
    /// Quote the next block fee and proof reward for a stored chain
    Quote {
        #[arg(long, env = "ANCHOREX_DB", default_value = "anchorex.db")]
        db: PathBuf,
        #[arg(long, value_enum, default_value_t)]
        preset: Preset,
        /// Quote time in seconds (defaults to one block after the last proposal)
        #[arg(long)]
        now: Option<u64>,
    },
}

#[derive(Serialize)]
struct BasefeeOutput {
    basefee: u64,
    gas_excess: u64,
}

#[derive(Serialize)]
struct QuoteOutput {
    now: u64,
    basefee: U256,
    block_fee: BlockFee,
    proof_reward: ProofReward,
}

#[derive(Serialize)]
struct SimSummary {
    height: u64,
    public_input_hash: B256,
    gas_excess: u64,
    fee_base_twei: u64,
    next_block_id: u64,
    last_block_id: u64,
    latest_synced_l1_height: u64,
    proposer_balance: U256,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,anchorex=debug")),
        )
        .init();

    match Args::parse().command {
        Command::CalcConfig {
            basefee,
            gas_issued_per_second,
            max_gas_excess,
            gas_target,
            ratio_2x1x,
        } => {
            let params =
                FeeMarketParams { basefee, gas_issued_per_second, max_gas_excess, gas_target };
            let config = match ratio_2x1x {
                Some(ratio) => calc_eip1559_config(
                    &ExpCurve,
                    basefee,
                    gas_issued_per_second,
                    max_gas_excess,
                    gas_target,
                    ratio,
                )?,
                None => params.eip1559_config()?,
            };
            print_json(&config)
        }
        Command::Basefee { preset, gas_excess, time_since_parent, parent_gas_used } => {
            let params = preset.fee_market();
            let config = params.eip1559_config()?;
            let gas_excess = gas_excess.unwrap_or_else(|| params.initial_gas_excess());
            let (basefee, gas_excess) = compute_basefee(
                &ExpCurve,
                &config,
                gas_excess,
                time_since_parent,
                parent_gas_used,
            )?;
            print_json(&BasefeeOutput { basefee, gas_excess })
        }
        Command::Simulate { db, chain_id, preset, blocks, gas_used, proof_lag } => {
            let store = SqliteStore::open(&db)
                .wrap_err_with(|| format!("failed to open {}", db.display()))?;
            simulate(&store, chain_id, preset, blocks, gas_used, proof_lag)
        }
        Command::Quote { db, preset, now } => {
            let store = SqliteStore::open(&db)
                .wrap_err_with(|| format!("failed to open {}", db.display()))?;
            quote(&store, preset, now)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load the stored chain, or initialize a fresh one at genesis.
fn load_or_init(
    store: &impl ChainStore,
    anchor: &L2Anchor,
    chain_id: u64,
    preset: Preset,
) -> Result<(ChainState, SimChain)> {
    if let Some(snapshot) = store.load_state()? {
        let state = ChainState::from_snapshot(&snapshot).wrap_err("corrupt chain state")?;
        // the last anchored block archived its parent
        let height = state.l2_hashes.last_key_value().map_or(0, |(number, _)| number + 1);
        info!(height, saved_at = snapshot.saved_at, "resuming chain");
        let chain = SimChain::new(chain_id, state.genesis_timestamp, L2_BLOCK_TIME).at(height);
        return Ok((state, chain));
    }

    let mut state = ChainState::new(L2_GENESIS_TIME).with_fee_base(preset.initial_fee_base());
    let chain = SimChain::new(chain_id, L2_GENESIS_TIME, L2_BLOCK_TIME);
    anchor.init(&mut state, &chain, preset.fee_market().initial_gas_excess())?;
    store.save_state(&state.to_snapshot(unix_now()))?;
    info!(chain_id, ?preset, "initialized new chain");
    Ok((state, chain))
}

fn simulate(
    store: &impl ChainStore,
    chain_id: u64,
    preset: Preset,
    blocks: u64,
    gas_used: u32,
    proof_lag: u64,
) -> Result<()> {
    let eip1559: Eip1559Config = preset.fee_market().eip1559_config()?;
    let anchor = L2Anchor::new(eip1559);
    let tokenomics = preset.tokenomics();
    tokenomics.validate()?;

    let (mut state, mut chain) = load_or_init(store, &anchor, chain_id, preset)?;
    let mut token = SimToken::funded(SIM_PROPOSER, U256::from(u64::MAX) * U256::from(TWEI));

    for _ in 0..blocks {
        chain.advance();
        let now = chain.timestamp();
        let number = chain.number();

        let time_since_parent = now.saturating_sub(state.parent_timestamp);
        let basefee = anchor.get_basefee(&state, time_since_parent, gas_used)?;
        let basefee = u64::try_from(basefee).map_err(|_| eyre!("basefee {basefee} exceeds u64"))?;
        chain.set_basefee(basefee);

        let l1_height = SIM_L1_START + number;
        let input = AnchorInput {
            l1_hash: keccak256(l1_height.to_be_bytes()),
            l1_signal_root: keccak256(keccak256(l1_height.to_be_bytes())),
            l1_height,
            parent_gas_used: gas_used,
        };
        let receipt = anchor
            .anchor(&mut state, &chain, GOLDEN_TOUCH_ADDRESS, &input)
            .wrap_err_with(|| format!("anchoring block {number} failed"))?;

        let fee = get_block_fee(&state, &tokenomics, now)?;
        if fee.deposit_amount > 0 {
            deposit(&mut state, &mut token, SIM_PROPOSER, from_twei(fee.deposit_amount))?;
        }
        commit_proposal(&mut state, &tokenomics, &fee, now);

        if state.unverified_blocks() > proof_lag {
            let proposed_at = now.saturating_sub(proof_lag * chain.block_time());
            let reward = get_proof_reward(&state, &tokenomics, now, proposed_at)?;
            commit_verification(&mut state, &tokenomics, &reward, now, proposed_at)?;
            debug!(
                prover = %SIM_PROVER,
                block_id = state.last_block_id,
                reward = reward.reward,
                relative_time_bp = reward.relative_time_bp,
                "verified block"
            );
        }

        // anchoring archived the L1 block and the parent hash, nothing else
        let snapshot = state.partial_snapshot(
            unix_now(),
            [receipt.synced.height],
            [receipt.anchored.number - 1],
        );
        store.save_state(&snapshot)?;
        info!(
            number,
            basefee = receipt.anchored.basefee,
            gas_excess = receipt.gas_excess,
            fee = fee.fee,
            fee_base = state.fee_base_twei,
            "produced block"
        );
    }

    print_json(&SimSummary {
        height: chain.number(),
        public_input_hash: state.public_input_hash,
        gas_excess: state.gas_excess,
        fee_base_twei: state.fee_base_twei,
        next_block_id: state.next_block_id,
        last_block_id: state.last_block_id,
        latest_synced_l1_height: state.latest_synced_l1_height,
        proposer_balance: state.balance_of(&SIM_PROPOSER),
    })
}

fn quote(store: &impl ChainStore, preset: Preset, now: Option<u64>) -> Result<()> {
    let snapshot = store.load_state()?.ok_or_else(|| eyre!("no chain state stored yet"))?;
    let state = ChainState::from_snapshot(&snapshot).wrap_err("corrupt chain state")?;
    let tokenomics = preset.tokenomics();
    let anchor = L2Anchor::new(preset.fee_market().eip1559_config()?);

    let now = now.unwrap_or(state.last_proposed_at + L2_BLOCK_TIME);
    let output = QuoteOutput {
        now,
        basefee: anchor.get_basefee(&state, now.saturating_sub(state.parent_timestamp), 0)?,
        block_fee: get_block_fee(&state, &tokenomics, now)?,
        proof_reward: get_proof_reward(&state, &tokenomics, now, state.last_proposed_at)?,
    };
    print_json(&output)
}
