//! Fee deposit ledger.
//!
//! Deposits burn protocol tokens from the caller and credit an internal balance;
//! withdrawals debit the balance and mint the tokens back. The token contract itself is an
//! external collaborator, found by name through a [`Resolver`].

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::state::ChainState;

/// Name the token collaborator is registered under.
pub const TOKEN_NAME: &str = "token";

/// Errors raised by the token collaborator or its resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("no address registered for {0:?}")]
    Unresolved(String),
    #[error("insufficient token balance for {account}: have {balance}, need {amount}")]
    InsufficientBalance { account: Address, balance: U256, amount: U256 },
    #[error("token supply overflow")]
    SupplyOverflow,
}

/// Errors from the deposit ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The withdrawal would empty (or overdraw) the balance.
    #[error("insufficient balance: have {balance}, withdrawing {amount}")]
    InsufficientBalance { balance: U256, amount: U256 },
    /// Crediting the deposit would overflow the balance.
    #[error("balance overflow")]
    BalanceOverflow,
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Token collaborator. Each call is atomic: it either fully applies or fails.
pub trait Token {
    fn mint(&mut self, account: Address, amount: U256) -> Result<(), TokenError>;
    fn burn(&mut self, account: Address, amount: U256) -> Result<(), TokenError>;
}

/// Name-to-contract lookup used to find the token collaborator.
pub trait Resolver {
    fn resolve_token(&mut self, name: &str) -> Result<&mut dyn Token, TokenError>;
}

/// Burn `amount` tokens from `caller` and credit them to the caller's balance.
///
/// A zero amount is a no-op.
pub fn deposit<R: Resolver + ?Sized>(
    state: &mut ChainState,
    resolver: &mut R,
    caller: Address,
    amount: U256,
) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Ok(());
    }

    let balance = state.balance_of(&caller);
    let credited = balance.checked_add(amount).ok_or(LedgerError::BalanceOverflow)?;

    resolver.resolve_token(TOKEN_NAME)?.burn(caller, amount)?;
    state.balances.insert(caller, credited);

    tracing::debug!(target: "anchorex::ledger", %caller, %amount, balance = %credited, "deposit");
    Ok(())
}

/// Debit `amount` from `caller`'s balance and mint it back to the caller.
///
/// Requires `balance > amount`. The remaining balance is clamped to at least 1 so the
/// entry never returns to the uninitialised zero state; the minted amount is
/// `balance - remainder`. Returns the minted amount.
pub fn withdraw<R: Resolver + ?Sized>(
    state: &mut ChainState,
    resolver: &mut R,
    caller: Address,
    amount: U256,
) -> Result<U256, LedgerError> {
    let balance = state.balance_of(&caller);
    if balance <= amount {
        return Err(LedgerError::InsufficientBalance { balance, amount });
    }

    let remainder = (balance - amount).max(U256::from(1u64));
    let minted = balance - remainder;

    resolver.resolve_token(TOKEN_NAME)?.mint(caller, minted)?;
    state.balances.insert(caller, remainder);

    tracing::debug!(target: "anchorex::ledger", %caller, %minted, balance = %remainder, "withdraw");
    Ok(minted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockToken {
        balances: HashMap<Address, U256>,
        minted: U256,
        burnt: U256,
    }

    impl Token for MockToken {
        fn mint(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
            *self.balances.entry(account).or_default() += amount;
            self.minted += amount;
            Ok(())
        }

        fn burn(&mut self, account: Address, amount: U256) -> Result<(), TokenError> {
            let balance = self.balances.get(&account).copied().unwrap_or_default();
            if balance < amount {
                return Err(TokenError::InsufficientBalance { account, balance, amount });
            }
            self.balances.insert(account, balance - amount);
            self.burnt += amount;
            Ok(())
        }
    }

    impl Resolver for MockToken {
        fn resolve_token(&mut self, name: &str) -> Result<&mut dyn Token, TokenError> {
            if name == TOKEN_NAME {
                Ok(self)
            } else {
                Err(TokenError::Unresolved(name.to_string()))
            }
        }
    }

    struct EmptyResolver;

    impl Resolver for EmptyResolver {
        fn resolve_token(&mut self, name: &str) -> Result<&mut dyn Token, TokenError> {
            Err(TokenError::Unresolved(name.to_string()))
        }
    }

    fn alice() -> Address {
        Address::repeat_byte(0xa1)
    }

    fn funded_token(amount: u64) -> MockToken {
        let mut token = MockToken::default();
        token.balances.insert(alice(), U256::from(amount));
        token
    }

    #[test]
    fn test_deposit_burns_and_credits() {
        let mut state = ChainState::default();
        let mut token = funded_token(1_000);

        deposit(&mut state, &mut token, alice(), U256::from(400u64)).unwrap();

        assert_eq!(state.balance_of(&alice()), U256::from(400u64));
        assert_eq!(token.balances[&alice()], U256::from(600u64));
        assert_eq!(token.burnt, U256::from(400u64));
    }

    #[test]
    fn test_deposit_zero_is_noop() {
        let mut state = ChainState::default();
        let mut resolver = EmptyResolver;

        deposit(&mut state, &mut resolver, alice(), U256::ZERO).unwrap();
        assert!(state.balances.is_empty());
    }

    #[test]
    fn test_deposit_failed_burn_leaves_balance() {
        let mut state = ChainState::default();
        let mut token = funded_token(10);

        let err = deposit(&mut state, &mut token, alice(), U256::from(11u64)).unwrap_err();
        assert!(matches!(err, LedgerError::Token(TokenError::InsufficientBalance { .. })));
        assert_eq!(state.balance_of(&alice()), U256::ZERO);
    }

    #[test]
    fn test_deposit_overflow_rejected_before_burn() {
        let mut state = ChainState::default();
        state.balances.insert(alice(), U256::MAX);
        let mut token = funded_token(10);

        let err = deposit(&mut state, &mut token, alice(), U256::from(1u64)).unwrap_err();
        assert_eq!(err, LedgerError::BalanceOverflow);
        assert_eq!(token.burnt, U256::ZERO);
    }

    #[test]
    fn test_withdraw_mints_difference() {
        let mut state = ChainState::default();
        state.balances.insert(alice(), U256::from(100u64));
        let mut token = MockToken::default();

        let minted = withdraw(&mut state, &mut token, alice(), U256::from(30u64)).unwrap();

        assert_eq!(minted, U256::from(30u64));
        assert_eq!(state.balance_of(&alice()), U256::from(70u64));
        assert_eq!(token.balances[&alice()], U256::from(30u64));
    }

    #[test]
    fn test_withdraw_leaves_at_least_one_unit() {
        for (balance, amount) in [(2u64, 1u64), (100, 99), (1_000, 1), (u64::MAX, u64::MAX - 1)] {
            let mut state = ChainState::default();
            state.balances.insert(alice(), U256::from(balance));
            let mut token = MockToken::default();

            let minted = withdraw(&mut state, &mut token, alice(), U256::from(amount)).unwrap();

            let remainder = U256::from(balance - amount).max(U256::from(1u64));
            assert_eq!(state.balance_of(&alice()), remainder);
            assert_eq!(minted, U256::from(balance) - remainder);
            assert!(state.balance_of(&alice()) >= U256::from(1u64));
        }
    }

    #[test]
    fn test_withdraw_requires_strictly_larger_balance() {
        let mut state = ChainState::default();
        state.balances.insert(alice(), U256::from(50u64));
        let mut token = MockToken::default();

        let err = withdraw(&mut state, &mut token, alice(), U256::from(50u64)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        let err = withdraw(&mut state, &mut token, alice(), U256::from(51u64)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

        assert_eq!(state.balance_of(&alice()), U256::from(50u64));
        assert_eq!(token.minted, U256::ZERO);
    }

    #[test]
    fn test_withdraw_unresolved_token_keeps_balance() {
        let mut state = ChainState::default();
        state.balances.insert(alice(), U256::from(50u64));

        let err = withdraw(&mut state, &mut EmptyResolver, alice(), U256::from(10u64)).unwrap_err();
        assert_eq!(err, LedgerError::Token(TokenError::Unresolved(TOKEN_NAME.to_string())));
        assert_eq!(state.balance_of(&alice()), U256::from(50u64));
    }
}
