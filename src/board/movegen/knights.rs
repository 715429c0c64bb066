use super::super::attack_tables::KNIGHT_ATTACKS;
use super::super::{pop_lsb, Bitboard, Board, MoveList, Square};

impl Board {
    pub(crate) fn generate_knight_moves(&self, from: Square) -> MoveList {
        let mut moves = MoveList::new();
        let color = self.current_color();
        let from_idx = from.index();
        let own_occ = self.occupied[color.index()].0;
        let mut targets = Bitboard(KNIGHT_ATTACKS[from_idx] & !own_occ);

        while targets.0 != 0 {
            let to_sq = pop_lsb(&mut targets);
            moves.push(self.create_move(from, to_sq, None, false, false));
        }
        moves
    }
}
