//! Legal-move generation.
//!
//! Moves are generated pseudo-legally and then filtered by king safety: a
//! move is legal when the mover's king is not attacked after playing it.

use super::board::{
    BoardState, Color, Piece, Role, Square, BISHOP_DIRECTIONS, KING_STEPS, KNIGHT_STEPS,
    ROOK_DIRECTIONS,
};

const PROMOTION_ROLES: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Normal,
    DoublePush,
    EnPassant,
    CastleKingside,
    CastleQueenside,
}

/// A fully specified move in a given position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub role: Role,
    pub captured: Option<Role>,
    pub promotion: Option<Role>,
    pub kind: MoveKind,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn is_castle(&self) -> bool {
        matches!(self.kind, MoveKind::CastleKingside | MoveKind::CastleQueenside)
    }
}

impl BoardState {
    /// Every legal move for the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        let us = self.side_to_move();
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|mv| !self.play(mv).is_in_check(us))
            .collect()
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_in_check(self.side_to_move()) && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_in_check(self.side_to_move()) && self.legal_moves().is_empty()
    }

    /// Apply `mv` to a copy of this position and return the copy.
    ///
    /// `mv` must come from [`BoardState::legal_moves`] (or the pseudo-legal
    /// set) of this very position; the receiver is never modified.
    pub fn play(&self, mv: &Move) -> BoardState {
        let mut next = self.clone();
        let us = self.side_to_move();

        next.set(mv.from, None);
        match mv.kind {
            MoveKind::EnPassant => {
                if let Some(victim) = Square::new(mv.to.file(), mv.from.rank()) {
                    next.set(victim, None);
                }
            }
            MoveKind::CastleKingside => {
                let rank = us.back_rank();
                if let (Some(rook_from), Some(rook_to)) = (Square::new(7, rank), Square::new(5, rank)) {
                    next.set(rook_from, None);
                    next.set(rook_to, Some(Piece::new(us, Role::Rook)));
                }
            }
            MoveKind::CastleQueenside => {
                let rank = us.back_rank();
                if let (Some(rook_from), Some(rook_to)) = (Square::new(0, rank), Square::new(3, rank)) {
                    next.set(rook_from, None);
                    next.set(rook_to, Some(Piece::new(us, Role::Rook)));
                }
            }
            MoveKind::Normal | MoveKind::DoublePush => {}
        }
        next.set(
            mv.to,
            Some(Piece::new(us, mv.promotion.unwrap_or(mv.role))),
        );

        let rights = next.castling_mut();
        if mv.role == Role::King {
            rights.revoke(us);
        }
        rights.revoke_corner(mv.from);
        rights.revoke_corner(mv.to);

        let ep = if mv.kind == MoveKind::DoublePush {
            Square::new(mv.from.file(), (mv.from.rank() + mv.to.rank()) / 2)
        } else {
            None
        };
        next.set_en_passant(ep);

        let halfmove = if mv.role == Role::Pawn || mv.is_capture() {
            0
        } else {
            self.halfmove_clock() + 1
        };
        let fullmove = match us {
            Color::White => self.fullmove_number(),
            Color::Black => self.fullmove_number() + 1,
        };
        next.set_clocks(halfmove, fullmove);
        next.set_side_to_move(us.opposite());
        next
    }

    fn pseudo_legal_moves(&self) -> Vec<Move> {
        let us = self.side_to_move();
        let mut moves = Vec::with_capacity(48);
        for (from, piece) in self.pieces() {
            if piece.color != us {
                continue;
            }
            match piece.role {
                Role::Pawn => self.pawn_moves(from, us, &mut moves),
                Role::Knight => self.step_moves(from, Role::Knight, &KNIGHT_STEPS, &mut moves),
                Role::King => {
                    self.step_moves(from, Role::King, &KING_STEPS, &mut moves);
                    self.castling_moves(from, us, &mut moves);
                }
                Role::Bishop => self.slide_moves(from, Role::Bishop, &BISHOP_DIRECTIONS, &mut moves),
                Role::Rook => self.slide_moves(from, Role::Rook, &ROOK_DIRECTIONS, &mut moves),
                Role::Queen => {
                    self.slide_moves(from, Role::Queen, &BISHOP_DIRECTIONS, &mut moves);
                    self.slide_moves(from, Role::Queen, &ROOK_DIRECTIONS, &mut moves);
                }
            }
        }
        moves
    }

    fn pawn_moves(&self, from: Square, us: Color, moves: &mut Vec<Move>) {
        let dir = us.forward();
        let start_rank = match us {
            Color::White => 1,
            Color::Black => 6,
        };
        let last_rank = us.opposite().back_rank();

        let push = |to: Square, captured: Option<Role>, kind: MoveKind, moves: &mut Vec<Move>| {
            if to.rank() == last_rank {
                for promo in PROMOTION_ROLES {
                    moves.push(Move {
                        from,
                        to,
                        role: Role::Pawn,
                        captured,
                        promotion: Some(promo),
                        kind,
                    });
                }
            } else {
                moves.push(Move {
                    from,
                    to,
                    role: Role::Pawn,
                    captured,
                    promotion: None,
                    kind,
                });
            }
        };

        if let Some(one) = from.offset(0, dir) {
            if self.piece_at(one).is_none() {
                push(one, None, MoveKind::Normal, moves);
                if from.rank() == start_rank {
                    if let Some(two) = one.offset(0, dir) {
                        if self.piece_at(two).is_none() {
                            push(two, None, MoveKind::DoublePush, moves);
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(to) = from.offset(df, dir) else {
                continue;
            };
            match self.piece_at(to) {
                Some(target) if target.color != us => {
                    push(to, Some(target.role), MoveKind::Normal, moves);
                }
                None if self.en_passant() == Some(to) => {
                    push(to, Some(Role::Pawn), MoveKind::EnPassant, moves);
                }
                _ => {}
            }
        }
    }

    fn step_moves(&self, from: Square, role: Role, steps: &[(i8, i8)], moves: &mut Vec<Move>) {
        let us = self.side_to_move();
        for &(df, dr) in steps {
            let Some(to) = from.offset(df, dr) else {
                continue;
            };
            match self.piece_at(to) {
                Some(target) if target.color == us => {}
                target => moves.push(Move {
                    from,
                    to,
                    role,
                    captured: target.map(|t| t.role),
                    promotion: None,
                    kind: MoveKind::Normal,
                }),
            }
        }
    }

    fn slide_moves(&self, from: Square, role: Role, dirs: &[(i8, i8)], moves: &mut Vec<Move>) {
        let us = self.side_to_move();
        for &(df, dr) in dirs {
            let mut cur = from;
            while let Some(to) = cur.offset(df, dr) {
                match self.piece_at(to) {
                    None => moves.push(Move {
                        from,
                        to,
                        role,
                        captured: None,
                        promotion: None,
                        kind: MoveKind::Normal,
                    }),
                    Some(target) => {
                        if target.color != us {
                            moves.push(Move {
                                from,
                                to,
                                role,
                                captured: Some(target.role),
                                promotion: None,
                                kind: MoveKind::Normal,
                            });
                        }
                        break;
                    }
                }
                cur = to;
            }
        }
    }

    fn castling_moves(&self, from: Square, us: Color, moves: &mut Vec<Move>) {
        let rank = us.back_rank();
        if Square::new(4, rank) != Some(from) || self.is_in_check(us) {
            return;
        }
        let them = us.opposite();
        let rook = Some(Piece::new(us, Role::Rook));
        let empty = |files: &[u8]| {
            files
                .iter()
                .all(|&f| Square::new(f, rank).is_some_and(|sq| self.piece_at(sq).is_none()))
        };
        let safe = |files: &[u8]| {
            files
                .iter()
                .all(|&f| Square::new(f, rank).is_some_and(|sq| !self.is_attacked(sq, them)))
        };

        if self.castling().kingside(us)
            && Square::new(7, rank).and_then(|sq| self.piece_at(sq)) == rook
            && empty(&[5, 6])
            && safe(&[5, 6])
        {
            if let Some(to) = Square::new(6, rank) {
                moves.push(Move {
                    from,
                    to,
                    role: Role::King,
                    captured: None,
                    promotion: None,
                    kind: MoveKind::CastleKingside,
                });
            }
        }

        if self.castling().queenside(us)
            && Square::new(0, rank).and_then(|sq| self.piece_at(sq)) == rook
            && empty(&[1, 2, 3])
            && safe(&[2, 3])
        {
            if let Some(to) = Square::new(2, rank) {
                moves.push(Move {
                    from,
                    to,
                    role: Role::King,
                    captured: None,
                    promotion: None,
                    kind: MoveKind::CastleQueenside,
                });
            }
        }
    }
}
