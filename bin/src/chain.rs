//! Deterministic native chain and token used by the simulator.

use std::collections::HashMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use anchorex_core::{BlockEnv, Resolver, Token, TokenError, NATIVE_LOOKBACK, TOKEN_NAME};

/// A chain whose block `n` has hash `keccak256(chain_id ++ n)` and timestamp
/// `genesis + n * block_time`.
#[derive(Debug, Clone)]
pub struct SimChain {
    chain_id: u64,
    genesis_timestamp: u64,
    block_time: u64,
    number: u64,
    basefee: u64,
    gas_limit: u64,
}

impl SimChain {
    pub fn new(chain_id: u64, genesis_timestamp: u64, block_time: u64) -> Self {
        Self {
            chain_id,
            genesis_timestamp,
            block_time,
            number: 0,
            basefee: 1,
            gas_limit: 30_000_000,
        }
    }

    /// Position the chain at block `number`.
    pub fn at(mut self, number: u64) -> Self {
        self.number = number;
        self
    }

    /// Move to the next block.
    pub fn advance(&mut self) {
        self.number += 1;
    }

    /// Set the base fee the executing block enforces.
    pub fn set_basefee(&mut self, basefee: u64) {
        self.basefee = basefee;
    }

    #[inline]
    pub fn block_time(&self) -> u64 {
        self.block_time
    }

    fn hash_of(&self, number: u64) -> B256 {
        let mut buf = [0u8; 16];
        buf[..8].copy_from_slice(&self.chain_id.to_be_bytes());
        buf[8..].copy_from_slice(&number.to_be_bytes());
        keccak256(buf)
    }
}

impl BlockEnv for SimChain {
    fn number(&self) -> u64 {
        self.number
    }

    fn timestamp(&self) -> u64 {
        self.genesis_timestamp + self.number * self.block_time
    }

    fn basefee(&self) -> u64 {
        self.basefee
    }

    fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    fn coinbase(&self) -> Address {
        Address::ZERO
    }

    fn prevrandao(&self) -> B256 {
        keccak256(self.hash_of(self.number))
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn blockhash(&self, number: u64) -> B256 {
        if number >= self.number || number + NATIVE_LOOKBACK < self.number {
            return B256::ZERO;
        }
        self.hash_of(number)
    }
}

/// Minimal token with unbounded minting, registered under [`TOKEN_NAME`].
#[derive(Debug, Default)]
pub struct SimToken {
    balances: HashMap<Address, U256>,
}

impl SimToken {
    /// Token where `account` holds `amount`.
    pub fn funded(account: Address, amount: U256) -> Self {
        let mut token = Self::default();
        token.balances.insert(account, amount);
        token
    }

    pub fn balance_of(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

impl Token for SimToken {
    fn mint(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self.balance_of(&account);
        let balance = balance.checked_add(amount).ok_or(TokenError::SupplyOverflow)?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn burn(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
        let balance = self.balance_of(&account);
        if balance < amount {
            return Err(TokenError::InsufficientBalance { account, balance, amount });
        }
        self.balances.insert(account, balance - amount);
        Ok(())
    }
}

impl Resolver for SimToken {
    fn resolve_token(&mut self, name: &str) -> Result<&mut dyn Token, TokenError> {
        if name == TOKEN_NAME {
            Ok(self)
        } else {
            Err(TokenError::Unresolved(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_chain_window() {
        let chain = SimChain::new(167_001, 1_000, 12).at(300);
        assert_eq!(chain.timestamp(), 1_000 + 300 * 12);
        assert_eq!(chain.blockhash(300), B256::ZERO);
        assert_eq!(chain.blockhash(43), B256::ZERO);
        assert_ne!(chain.blockhash(44), B256::ZERO);
        assert_ne!(chain.blockhash(299), chain.blockhash(298));

        let other = SimChain::new(167_002, 1_000, 12).at(300);
        assert_ne!(chain.blockhash(299), other.blockhash(299));
    }

    #[test]
    fn test_sim_token() {
        let alice = Address::repeat_byte(0xa1);
        let mut token = SimToken::funded(alice, U256::from(10u64));

        token.burn(alice, U256::from(4u64)).unwrap();
        assert_eq!(token.balance_of(&alice), U256::from(6u64));
        assert!(token.burn(alice, U256::from(7u64)).is_err());

        token.mint(alice, U256::from(1u64)).unwrap();
        assert_eq!(token.balance_of(&alice), U256::from(7u64));

        assert!(token.resolve_token("registry").is_err());
    }
}
