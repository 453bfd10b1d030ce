//! Property-Based Tests for the NovaLend Accounting Invariants
//!
//! Uses proptest to drive random operation sequences against a local chain
//! on the mock backend and checks that solvency, supply conservation and
//! the clamp rules hold after every step.

use novalend::prelude::*;
use proptest::prelude::*;

const WEI_PER_MICRO: u128 = 1_000_000_000_000;
const ACCOUNTS: [&str; 2] = ["alice", "bob"];

// =============================================================================
// HELPERS
// =============================================================================

fn account(index: usize) -> Address {
    Address::from_label(ACCOUNTS[index % ACCOUNTS.len()])
}

/// Chain where every account has granted the engine a year-long operator
fn chain_with_grants() -> LocalChain<MockClient> {
    let mut chain = LocalChain::deploy(MockClient, ChainConfig::default()).unwrap();
    for index in 0..ACCOUNTS.len() {
        chain.as_user(account(index)).approve_operator(365).unwrap();
    }
    chain
}

fn borrow(chain: &mut LocalChain<MockClient>, who: Address, micro: u64) -> Result<Euint64, NodeError> {
    let input = chain
        .create_encrypted_input(chain.engine_address(), who)
        .add64(micro)
        .encrypt()?;
    chain.borrow(who, &input)
}

fn repay(chain: &mut LocalChain<MockClient>, who: Address, micro: u64) -> Result<Euint64, NodeError> {
    let input = chain
        .create_encrypted_input(chain.token_address(), chain.engine_address())
        .add64(micro)
        .encrypt()?;
    chain.repay(who, &input)
}

fn transfer(chain: &mut LocalChain<MockClient>, from: Address, to: Address, micro: u64) -> Result<Euint64, NodeError> {
    let input = chain
        .create_encrypted_input(chain.token_address(), from)
        .add64(micro)
        .encrypt()?;
    chain.confidential_transfer(from, to, &input)
}

fn debt(chain: &LocalChain<MockClient>, who: Address) -> u64 {
    let handle = chain.encrypted_debt_of(&who).handle();
    chain.user_decrypt_u64(handle, chain.engine_address(), who).unwrap()
}

fn collateral(chain: &LocalChain<MockClient>, who: Address) -> u64 {
    let handle = chain.encrypted_collateral_of(&who).handle();
    chain.user_decrypt_u64(handle, chain.engine_address(), who).unwrap()
}

fn balance(chain: &LocalChain<MockClient>, who: Address) -> u64 {
    let handle = chain.confidential_balance_of(&who).handle();
    chain.user_decrypt_u64(handle, chain.token_address(), who).unwrap()
}

fn total_supply(chain: &LocalChain<MockClient>) -> u64 {
    let token = chain.token_address();
    let handle = chain.token().confidential_total_supply().handle();
    chain.user_decrypt_u64(handle, token, token).unwrap()
}

fn max_borrow(chain: &LocalChain<MockClient>, who: Address) -> u64 {
    chain.engine().config().max_borrow_plain(collateral(chain, who))
}

// =============================================================================
// PROPTEST STRATEGIES
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Stake { who: usize, micro_eth: u64 },
    Borrow { who: usize, micro: u64 },
    Repay { who: usize, micro: u64 },
    Transfer { from: usize, to: usize, micro: u64 },
    Withdraw { who: usize },
}

/// Amounts in micro-USDT, biased towards the interesting range around the
/// limits of a few ETH of collateral
fn usdt_amount() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..=5_000_000_000,
        Just(0u64),
        Just(u64::MAX),
        any::<u64>(),
    ]
}

fn stake_amount() -> impl Strategy<Value = u64> {
    1u64..=5_000_000
}

fn who() -> impl Strategy<Value = usize> {
    0..ACCOUNTS.len()
}

/// Operations that never release collateral while debt is outstanding
fn solvent_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (who(), stake_amount()).prop_map(|(who, micro_eth)| Op::Stake { who, micro_eth }),
        (who(), usdt_amount()).prop_map(|(who, micro)| Op::Borrow { who, micro }),
        (who(), usdt_amount()).prop_map(|(who, micro)| Op::Repay { who, micro }),
        (who(), who(), usdt_amount()).prop_map(|(from, to, micro)| Op::Transfer { from, to, micro }),
    ]
}

fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => solvent_op(),
        1 => who().prop_map(|who| Op::Withdraw { who }),
    ]
}

fn apply(chain: &mut LocalChain<MockClient>, op: &Op) {
    // Reverts are part of the explored space; invariants must hold either way
    let _ = match *op {
        Op::Stake { who, micro_eth } => chain.stake(account(who), micro_eth as u128 * WEI_PER_MICRO).map(|_| ()),
        Op::Borrow { who, micro } => borrow(chain, account(who), micro).map(|_| ()),
        Op::Repay { who, micro } => repay(chain, account(who), micro).map(|_| ()),
        Op::Transfer { from, to, micro } => transfer(chain, account(from), account(to), micro).map(|_| ()),
        Op::Withdraw { who } => chain.withdraw_all(account(who)).map(|_| ()),
    };
}

// =============================================================================
// INVARIANT PROPERTY TESTS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: debt never exceeds the borrow limit of the collateral
    #[test]
    fn debt_never_exceeds_limit(ops in prop::collection::vec(solvent_op(), 1..24)) {
        let mut chain = chain_with_grants();

        for op in &ops {
            apply(&mut chain, op);
            for index in 0..ACCOUNTS.len() {
                let who = account(index);
                prop_assert!(debt(&chain, who) <= max_borrow(&chain, who), "after {:?}", op);
            }
        }
    }

    /// Property: balances always sum to the total supply
    #[test]
    fn balances_sum_to_total_supply(ops in prop::collection::vec(any_op(), 1..24)) {
        let mut chain = chain_with_grants();
        let engine = chain.engine_address();

        for op in &ops {
            apply(&mut chain, op);
            let held: u128 = (0..ACCOUNTS.len())
                .map(|index| balance(&chain, account(index)) as u128)
                .sum::<u128>()
                + balance(&chain, engine) as u128;
            prop_assert_eq!(held, total_supply(&chain) as u128, "after {:?}", op);
            prop_assert_eq!(balance(&chain, engine), 0);
        }
    }

    /// Property: staked native value is fully backed by the engine's balance
    #[test]
    fn engine_holds_all_stakes(ops in prop::collection::vec(any_op(), 1..24)) {
        let mut chain = chain_with_grants();
        let engine = chain.engine_address();

        for op in &ops {
            apply(&mut chain, op);
            let staked: u128 = (0..ACCOUNTS.len())
                .map(|index| chain.engine().staked_wei_of(&account(index)))
                .sum();
            prop_assert_eq!(chain.native_balance_of(&engine), staked);
        }
    }
}

// =============================================================================
// CLAMP PROPERTY TESTS
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: a borrow adds exactly min(request, limit - debt)
    #[test]
    fn borrow_is_clamped_to_headroom(
        micro_eth in stake_amount(),
        first in usdt_amount(),
        second in usdt_amount(),
    ) {
        let mut chain = chain_with_grants();
        let alice = account(0);
        chain.stake(alice, micro_eth as u128 * WEI_PER_MICRO).unwrap();
        let limit = max_borrow(&chain, alice);

        for request in [first, second] {
            let before = debt(&chain, alice);
            let borrowed = borrow(&mut chain, alice, request).unwrap();
            let expected = request.min(limit - before);

            prop_assert_eq!(
                chain.user_decrypt_u64(borrowed.handle(), chain.engine_address(), alice).unwrap(),
                expected
            );
            prop_assert_eq!(debt(&chain, alice), before + expected);
            prop_assert_eq!(balance(&chain, alice), before + expected);
        }
    }

    /// Property: a repay burns exactly min(request, debt)
    #[test]
    fn repay_is_clamped_to_debt(
        borrowed in 1u64..=1_000_000_000,
        request in usdt_amount(),
    ) {
        let mut chain = chain_with_grants();
        let alice = account(0);
        chain.stake(alice, WEI_PER_MICRO * 1_000_000).unwrap();
        borrow(&mut chain, alice, borrowed).unwrap();

        let repaid = repay(&mut chain, alice, request).unwrap();
        let expected = request.min(borrowed);

        prop_assert_eq!(
            chain.user_decrypt_u64(repaid.handle(), chain.engine_address(), alice).unwrap(),
            expected
        );
        prop_assert_eq!(debt(&chain, alice), borrowed - expected);
        prop_assert_eq!(balance(&chain, alice), borrowed - expected);
        prop_assert_eq!(total_supply(&chain), borrowed - expected);
    }

    /// Property: repay is also bounded by the wallet balance
    #[test]
    fn repay_is_clamped_to_balance(
        borrowed in 2u64..=1_000_000_000,
        sent_away in 1u64..=1_000_000_000,
    ) {
        let mut chain = chain_with_grants();
        let (alice, bob) = (account(0), account(1));
        chain.stake(alice, WEI_PER_MICRO * 1_000_000).unwrap();
        borrow(&mut chain, alice, borrowed).unwrap();
        transfer(&mut chain, alice, bob, sent_away).unwrap();
        let remaining = borrowed.saturating_sub(sent_away);

        repay(&mut chain, alice, u64::MAX).unwrap();

        prop_assert_eq!(balance(&chain, alice), 0);
        prop_assert_eq!(debt(&chain, alice), borrowed - remaining);
    }
}
