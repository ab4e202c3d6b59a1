//! Turn-based board game with explicit win claims.
//!
//! Players alternate writing their mark into a 3x3 board. A win is never
//! inferred: the winning player must claim the line, and the claim is
//! re-verified against the post-move board before it is accepted. Likewise a
//! draw must be claimed against a full board.

use crate::codec::decode;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolType};
use arbiter_primitives::{
    default_turn_taker, AppDefinition, Application, Outcome, ProtocolError, TwoPartyOutcome,
};
use std::convert::TryFrom;

type TicTacToeStateSchema = sol! { tuple(uint256, uint256, uint256[3][3]) };
type TicTacToeActionSchema = sol! { tuple(uint8, uint256, uint256, uint8, uint256) };

/// Winner marker values persisted in the state.
const IN_PROGRESS: u64 = 0;
const FIRST_WINS: u64 = 1;
const SECOND_WINS: u64 = 2;
const DRAW: u64 = 3;

/// The decoded state of a tic tac toe game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToeState {
    /// The mandatory, monotonically increasing state version.
    pub version: U256,
    /// 0 while in progress, 1/2 for a won game, 3 for a claimed draw.
    pub winner: U256,
    /// Row-major board; 0 empty, 1/2 the players' marks.
    pub board: [[U256; 3]; 3],
}

impl TicTacToeState {
    /// The opening state: an empty board with no winner.
    pub fn opening() -> Self {
        Self {
            version: U256::ZERO,
            winner: U256::ZERO,
            board: Default::default(),
        }
    }

    /// Encodes this state into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        TicTacToeStateSchema::abi_encode(&(self.version, self.winner, self.board))
    }

    /// Decodes a state buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (version, winner, board) = decode::<TicTacToeStateSchema>(buf, "tic tac toe state")?;
        Ok(Self {
            version,
            winner,
            board,
        })
    }
}

/// The type tag of a [TicTacToeAction].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicTacToeActionKind {
    /// Place a mark without any claim.
    Play = 0,
    /// Place a mark and claim the stated line is now won.
    PlayAndWin = 1,
    /// Place a mark and claim the board is now full.
    PlayAndDraw = 2,
}

impl TryFrom<u8> for TicTacToeActionKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TicTacToeActionKind::Play),
            1 => Ok(TicTacToeActionKind::PlayAndWin),
            2 => Ok(TicTacToeActionKind::PlayAndDraw),
            _ => Err(ProtocolError::schema(format!(
                "invalid tic tac toe action kind: {value}"
            ))),
        }
    }
}

/// The shape of a claimed win line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinClaimType {
    /// The row at the claimed index.
    Row = 0,
    /// The column at the claimed index.
    Col = 1,
    /// The main diagonal.
    Diag = 2,
    /// The anti-diagonal.
    CrossDiag = 3,
}

impl TryFrom<u8> for WinClaimType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WinClaimType::Row),
            1 => Ok(WinClaimType::Col),
            2 => Ok(WinClaimType::Diag),
            3 => Ok(WinClaimType::CrossDiag),
            _ => Err(ProtocolError::schema(format!(
                "invalid win claim type: {value}"
            ))),
        }
    }
}

/// A tagged tic tac toe action: a move coordinate plus an optional claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToeAction {
    /// Which action this is.
    pub kind: TicTacToeActionKind,
    /// The row of the played cell.
    pub x: U256,
    /// The column of the played cell.
    pub y: U256,
    /// The claimed line shape (for [TicTacToeActionKind::PlayAndWin]).
    pub claim_type: WinClaimType,
    /// The claimed row/column index; ignored for diagonal claims.
    pub claim_index: U256,
}

impl TicTacToeAction {
    /// Encodes this action into its canonical buffer.
    pub fn encode(&self) -> Vec<u8> {
        TicTacToeActionSchema::abi_encode(&(
            self.kind as u8,
            self.x,
            self.y,
            self.claim_type as u8,
            self.claim_index,
        ))
    }

    /// Decodes an action buffer, failing fast on any schema mismatch.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        let (kind, x, y, claim_type, claim_index) =
            decode::<TicTacToeActionSchema>(buf, "tic tac toe action")?;
        Ok(Self {
            kind: TicTacToeActionKind::try_from(kind)?,
            x,
            y,
            claim_type: WinClaimType::try_from(claim_type)?,
            claim_index,
        })
    }
}

/// Turn-based board game with explicit win claims.
#[derive(Debug, Clone, Copy)]
pub struct TicTacToe;

impl TicTacToe {
    fn cell_index(value: U256, what: &str) -> Result<usize, ProtocolError> {
        if value > U256::from(2) {
            return Err(ProtocolError::precondition(format!(
                "{what} {value} out of range"
            )));
        }
        Ok(value.to::<usize>())
    }

    /// Re-verifies a win claim against the post-move board: every cell of
    /// the claimed line must carry the claiming player's mark.
    fn line_is_won(board: &[[U256; 3]; 3], claim: &TicTacToeAction, mark: U256) -> Result<bool, ProtocolError> {
        let cells: [(usize, usize); 3] = match claim.claim_type {
            WinClaimType::Row => {
                let row = Self::cell_index(claim.claim_index, "claimed row")?;
                [(row, 0), (row, 1), (row, 2)]
            }
            WinClaimType::Col => {
                let col = Self::cell_index(claim.claim_index, "claimed column")?;
                [(0, col), (1, col), (2, col)]
            }
            WinClaimType::Diag => [(0, 0), (1, 1), (2, 2)],
            WinClaimType::CrossDiag => [(0, 2), (1, 1), (2, 0)],
        };
        Ok(cells.iter().all(|&(x, y)| board[x][y] == mark))
    }

    fn board_is_full(board: &[[U256; 3]; 3]) -> bool {
        board.iter().flatten().all(|cell| !cell.is_zero())
    }
}

impl Application for TicTacToe {
    fn definition(&self) -> AppDefinition {
        AppDefinition::TicTacToe
    }

    fn is_state_terminal(&self, state: &[u8]) -> Result<bool, ProtocolError> {
        Ok(!TicTacToeState::decode(state)?.winner.is_zero())
    }

    fn get_turn_taker(
        &self,
        state: &[u8],
        participants: &[Address],
    ) -> Result<Address, ProtocolError> {
        let state = TicTacToeState::decode(state)?;
        default_turn_taker(state.version, participants)
    }

    fn apply_action(
        &self,
        state: &[u8],
        action: &[u8],
        _block_height: u64,
    ) -> Result<Vec<u8>, ProtocolError> {
        let state = TicTacToeState::decode(state)?;
        let action = TicTacToeAction::decode(action)?;

        if !state.winner.is_zero() {
            return Err(ProtocolError::precondition("game already concluded"));
        }

        let x = Self::cell_index(action.x, "played row")?;
        let y = Self::cell_index(action.y, "played column")?;
        if !state.board[x][y].is_zero() {
            return Err(ProtocolError::precondition(format!(
                "cell ({x}, {y}) is already occupied"
            )));
        }

        // Version parity decides whose mark is written: versions 0, 2, ...
        // belong to the first player.
        let mark = U256::from(state.version.wrapping_rem(U256::from(2)).to::<u64>() + 1);
        let mut board = state.board;
        board[x][y] = mark;

        let winner = match action.kind {
            TicTacToeActionKind::Play => state.winner,
            TicTacToeActionKind::PlayAndWin => {
                if !Self::line_is_won(&board, &action, mark)? {
                    return Err(ProtocolError::precondition(
                        "claimed win line is not won by the acting player",
                    ));
                }
                mark
            }
            TicTacToeActionKind::PlayAndDraw => {
                if !Self::board_is_full(&board) {
                    return Err(ProtocolError::precondition(
                        "draw claimed on a board that is not full",
                    ));
                }
                U256::from(DRAW)
            }
        };

        Ok(TicTacToeState {
            version: state.version + U256::from(1),
            winner,
            board,
        }
        .encode())
    }

    fn compute_outcome(
        &self,
        state: &[u8],
        _block_height: u64,
    ) -> Result<Outcome, ProtocolError> {
        let state = TicTacToeState::decode(state)?;

        let resolution = if state.winner == U256::from(FIRST_WINS) {
            TwoPartyOutcome::SendToFirst
        } else if state.winner == U256::from(SECOND_WINS) {
            TwoPartyOutcome::SendToSecond
        } else if state.winner == U256::from(DRAW) {
            TwoPartyOutcome::SplitAndSend
        } else if state.winner == U256::from(IN_PROGRESS) {
            // The game never concluded: the side whose turn it is has
            // stalled, and the counterparty is paid.
            if state.version.wrapping_rem(U256::from(2)).is_zero() {
                TwoPartyOutcome::SendToSecond
            } else {
                TwoPartyOutcome::SendToFirst
            }
        } else {
            return Err(ProtocolError::schema(format!(
                "invalid winner marker: {}",
                state.winner
            )));
        };
        Ok(Outcome::TwoParty(resolution))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn play(x: u64, y: u64) -> Vec<u8> {
        TicTacToeAction {
            kind: TicTacToeActionKind::Play,
            x: U256::from(x),
            y: U256::from(y),
            claim_type: WinClaimType::Row,
            claim_index: U256::ZERO,
        }
        .encode()
    }

    fn play_and_win(x: u64, y: u64, claim_type: WinClaimType, claim_index: u64) -> Vec<u8> {
        TicTacToeAction {
            kind: TicTacToeActionKind::PlayAndWin,
            x: U256::from(x),
            y: U256::from(y),
            claim_type,
            claim_index: U256::from(claim_index),
        }
        .encode()
    }

    /// X plays the top row, O plays the middle row; X's third move claims
    /// the top row win.
    fn x_wins_top_row() -> Vec<u8> {
        let app = TicTacToe;
        let mut state = TicTacToeState::opening().encode();
        for action in [play(0, 0), play(1, 0), play(0, 1), play(1, 1)] {
            state = app.apply_action(&state, &action, 0).unwrap();
        }
        app.apply_action(&state, &play_and_win(0, 2, WinClaimType::Row, 0), 0)
            .unwrap()
    }

    #[test]
    fn verified_win_claim_marks_the_winner() {
        let terminal = x_wins_top_row();
        let decoded = TicTacToeState::decode(&terminal).unwrap();
        assert_eq!(decoded.winner, U256::from(FIRST_WINS));
        assert_eq!(decoded.version, U256::from(5));
        assert!(TicTacToe.is_state_terminal(&terminal).unwrap());
        assert_eq!(
            TicTacToe.compute_outcome(&terminal, 0).unwrap(),
            Outcome::TwoParty(TwoPartyOutcome::SendToFirst)
        );
    }

    #[test]
    fn false_win_claim_is_rejected() {
        let app = TicTacToe;
        let state = TicTacToeState::opening().encode();

        // One mark in the corner does not win the top row.
        assert!(matches!(
            app.apply_action(&state, &play_and_win(0, 0, WinClaimType::Row, 0), 0),
            Err(ProtocolError::Precondition { .. })
        ));
    }

    #[test]
    fn occupied_cell_is_rejected() {
        let app = TicTacToe;
        let state = TicTacToeState::opening().encode();
        let state = app.apply_action(&state, &play(1, 1), 0).unwrap();
        assert!(matches!(
            app.apply_action(&state, &play(1, 1), 0),
            Err(ProtocolError::Precondition { .. })
        ));
    }

    #[test]
    fn out_of_range_coordinate_is_rejected() {
        let app = TicTacToe;
        let state = TicTacToeState::opening().encode();
        assert!(matches!(
            app.apply_action(&state, &play(3, 0), 0),
            Err(ProtocolError::Precondition { .. })
        ));
    }

    #[test]
    fn premature_draw_claim_is_rejected() {
        let app = TicTacToe;
        let state = TicTacToeState::opening().encode();
        let draw = TicTacToeAction {
            kind: TicTacToeActionKind::PlayAndDraw,
            x: U256::ZERO,
            y: U256::ZERO,
            claim_type: WinClaimType::Row,
            claim_index: U256::ZERO,
        }
        .encode();
        assert!(matches!(
            app.apply_action(&state, &draw, 0),
            Err(ProtocolError::Precondition { .. })
        ));
    }

    #[test]
    fn concluded_game_rejects_further_moves() {
        let terminal = x_wins_top_row();
        assert!(matches!(
            TicTacToe.apply_action(&terminal, &play(2, 2), 0),
            Err(ProtocolError::Precondition { .. })
        ));
    }

    #[test]
    fn unresolved_game_forfeits_the_stalled_side() {
        let app = TicTacToe;

        // Version 0: the first player owes a move and has stalled.
        let state = TicTacToeState::opening().encode();
        assert_eq!(
            app.compute_outcome(&state, 0).unwrap(),
            Outcome::TwoParty(TwoPartyOutcome::SendToSecond)
        );

        // Version 1: now the second player owes the move.
        let state = app.apply_action(&state, &play(0, 0), 0).unwrap();
        assert_eq!(
            app.compute_outcome(&state, 0).unwrap(),
            Outcome::TwoParty(TwoPartyOutcome::SendToFirst)
        );
    }

    #[test]
    fn diagonal_win_claims_are_verified() {
        let app = TicTacToe;
        let mut state = TicTacToeState::opening().encode();
        for action in [play(0, 0), play(0, 1), play(1, 1), play(0, 2)] {
            state = app.apply_action(&state, &action, 0).unwrap();
        }
        let terminal = app
            .apply_action(&state, &play_and_win(2, 2, WinClaimType::Diag, 0), 0)
            .unwrap();
        assert_eq!(
            TicTacToeState::decode(&terminal).unwrap().winner,
            U256::from(FIRST_WINS)
        );
    }

    proptest! {
        #[test]
        fn first_move_increments_the_version(x in 0u64..3, y in 0u64..3) {
            let state = TicTacToeState::opening().encode();
            let next = TicTacToe.apply_action(&state, &play(x, y), 0).unwrap();
            let decoded = TicTacToeState::decode(&next).unwrap();
            prop_assert_eq!(decoded.version, U256::from(1));
            prop_assert_eq!(decoded.board[x as usize][y as usize], U256::from(1));
        }

        #[test]
        fn state_round_trips(version in any::<u64>(), cells in proptest::array::uniform9(0u64..3)) {
            let mut board = [[U256::ZERO; 3]; 3];
            for (i, cell) in cells.iter().enumerate() {
                board[i / 3][i % 3] = U256::from(*cell);
            }
            let state = TicTacToeState {
                version: U256::from(version),
                winner: U256::ZERO,
                board,
            };
            prop_assert_eq!(TicTacToeState::decode(&state.encode()).unwrap(), state);
        }
    }
}
