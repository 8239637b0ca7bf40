/*
 * Universal Router commands and V4 router actions
 */

use ethers::types::Bytes;

/// Universal Router command opcodes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Permit2Permit = 0x0a,
    V4Swap = 0x10,
}

/// Actions executed by the V4 router inside a `V4_SWAP` command.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SwapExactInSingle = 0x06,
    SettleAll = 0x0c,
    TakeAll = 0x0f,
}

/// Swap, then settle the input, then take the output. The pool manager's
/// delta accounting requires this order.
pub const SWAP_ACTIONS: [Action; 3] = [Action::SwapExactInSingle, Action::SettleAll, Action::TakeAll];

fn pack<T: Copy + Into<u8>>(ops: &[T]) -> Bytes {
    ops.iter().map(|op| (*op).into()).collect::<Vec<u8>>().into()
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

impl From<Action> for u8 {
    fn from(action: Action) -> Self {
        action as u8
    }
}

/// ETH -> token: a single V4 swap.
#[must_use]
pub fn encode_buy_commands() -> Bytes {
    pack(&[Command::V4Swap])
}

/// Token -> ETH: consume the Permit2 signature before the router pulls the token.
#[must_use]
pub fn encode_sell_commands() -> Bytes {
    pack(&[Command::Permit2Permit, Command::V4Swap])
}

#[must_use]
pub fn encode_swap_actions() -> Bytes {
    pack(&SWAP_ACTIONS)
}
