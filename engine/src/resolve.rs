// ═══════════════════════════════════════════════════════════════════════
// Action resolver — validates and applies one interactive night action
//
// Every function here follows the same contract:
//   - a malformed selection returns None and touches nothing
//   - a well-formed selection mutates the game, appends exactly one
//     night log entry and returns exactly one ActionResult
//   - a shielded target turns the action into an `info` result that
//     records the attempt and changes no cards
// Identity checks use the current `role` field; whose turn it is was
// decided from `original_role` before we got here.
// ═══════════════════════════════════════════════════════════════════════

use crate::roles::NightSlot;
use crate::types::*;

/// Resolve an action submitted by `actor` during the turn for `slot`.
/// Passive slots have nothing to resolve and always return None.
pub fn resolve(
    game: &mut Game,
    slot: NightSlot,
    lone_wolf: bool,
    actor: PlayerId,
    targets: &[Target],
) -> Option<ActionResult> {
    game.player(actor)?;
    match slot {
        NightSlot::WolfPack if lone_wolf => lone_wolf_peek(game, actor, targets),
        NightSlot::WolfPack => None,
        NightSlot::Solo(role) => match role {
            Role::Sentinel => sentinel(game, actor, targets),
            Role::AlphaWolf => alpha_wolf(game, actor, targets),
            Role::MysticWolf => mystic_wolf(game, actor, targets),
            Role::Seer => seer(game, actor, targets),
            Role::ApprenticeSeer => apprentice_seer(game, actor, targets),
            Role::ParanormalInvestigator => investigator(game, actor, targets),
            Role::Robber => robber(game, actor, targets),
            Role::Witch => witch(game, actor, targets),
            Role::Troublemaker => troublemaker(game, actor, targets),
            Role::Drunk => drunk(game, actor, targets),
            Role::Revealer => revealer(game, actor, targets),
            _ => None,
        },
    }
}

// ── Selection shape ────────────────────────────────────────────────────

/// A selection split into player and center targets, in submission order.
struct Selection {
    players: Vec<PlayerId>,
    centers: Vec<usize>,
}

/// Checks that apply to every role: known players, center index 0..3, no
/// repeated target, and (unless allowed) no self-target.
fn split(game: &Game, actor: PlayerId, targets: &[Target], allow_self: bool) -> Option<Selection> {
    let mut sel = Selection { players: Vec::new(), centers: Vec::new() };
    for target in targets {
        match *target {
            Target::Player(id) => {
                if game.player(id).is_none() || (!allow_self && id == actor) || sel.players.contains(&id) {
                    return None;
                }
                sel.players.push(id);
            }
            Target::Center(index) => {
                let index = index as usize;
                if index >= CENTER_CARDS || index >= game.center.len() || sel.centers.contains(&index) {
                    return None;
                }
                sel.centers.push(index);
            }
        }
    }
    Some(sel)
}

/// Exactly one other player and no center card.
fn single_other(game: &Game, actor: PlayerId, targets: &[Target]) -> Option<PlayerId> {
    let sel = split(game, actor, targets, false)?;
    match (sel.players.as_slice(), sel.centers.as_slice()) {
        ([target], []) => Some(*target),
        _ => None,
    }
}

/// Exactly one center card and no player.
fn single_center(game: &Game, actor: PlayerId, targets: &[Target]) -> Option<usize> {
    let sel = split(game, actor, targets, false)?;
    match (sel.players.as_slice(), sel.centers.as_slice()) {
        ([], [index]) => Some(*index),
        _ => None,
    }
}

fn current_role(game: &Game, id: PlayerId) -> Option<Role> {
    game.player(id).map(|p| p.role)
}

fn center_view(game: &Game, index: usize) -> CenterView {
    CenterView { index: index as u8, role: game.center[index] }
}

fn blocked(game: &mut Game, role: Role, actor: &str, verb: &str, target: &str) -> ActionResult {
    game.night_log.append(
        role,
        format!("{} tried to {} {}, but their card was shielded", actor, verb, target),
    );
    ActionResult::shielded(target)
}

// ── Sentinel ───────────────────────────────────────────────────────────

fn sentinel(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let target = single_other(game, actor, targets)?;
    let (a, t) = (game.name_of(actor), game.name_of(target));
    game.shielded.insert(target);
    game.night_log.append(Role::Sentinel, format!("{} placed a shield on {}", a, t));
    Some(ActionResult::info(format!(
        "You placed a shield on {}. Their card cannot be viewed or moved tonight.",
        t
    )))
}

// ── Wolves ─────────────────────────────────────────────────────────────

fn lone_wolf_peek(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let index = single_center(game, actor, targets)?;
    let seen = center_view(game, index);
    game.night_log.append(
        Role::Werewolf,
        format!(
            "{} was the only wolf awake and looked at center card {}: {}",
            game.name_of(actor),
            index + 1,
            seen.role
        ),
    );
    Some(ActionResult::ViewCenter { cards: vec![seen] })
}

fn alpha_wolf(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let target = single_other(game, actor, targets)?;
    let (a, t) = (game.name_of(actor), game.name_of(target));
    if game.is_shielded(target) {
        return Some(blocked(game, Role::AlphaWolf, &a, "transform", &t));
    }

    let current = current_role(game, target)?;
    if current.is_wolf_team() {
        game.night_log.append(
            Role::AlphaWolf,
            format!("{} chose {}, who was already on the werewolf team", a, t),
        );
        return Some(ActionResult::info(format!("{} is already on the werewolf team.", t)));
    }

    game.player_mut(target)?.role = Role::Werewolf;
    game.night_log.append(
        Role::AlphaWolf,
        format!("{} turned {} ({}) into a Werewolf", a, t, current),
    );
    Some(ActionResult::info(format!("{} is now a Werewolf.", t)))
}

fn mystic_wolf(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let target = single_other(game, actor, targets)?;
    let (a, t) = (game.name_of(actor), game.name_of(target));
    if game.is_shielded(target) {
        return Some(blocked(game, Role::MysticWolf, &a, "view", &t));
    }
    let role = current_role(game, target)?;
    game.night_log.append(Role::MysticWolf, format!("{} looked at {}'s card: {}", a, t, role));
    Some(ActionResult::View { player: target, name: t, role })
}

// ── Seers ──────────────────────────────────────────────────────────────

fn seer(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let sel = split(game, actor, targets, false)?;
    let a = game.name_of(actor);
    match (sel.players.as_slice(), sel.centers.as_slice()) {
        (&[target], []) => {
            let t = game.name_of(target);
            if game.is_shielded(target) {
                return Some(blocked(game, Role::Seer, &a, "view", &t));
            }
            let role = current_role(game, target)?;
            game.night_log.append(Role::Seer, format!("{} looked at {}'s card: {}", a, t, role));
            Some(ActionResult::View { player: target, name: t, role })
        }
        ([], &[first, second]) => {
            let cards = vec![center_view(game, first), center_view(game, second)];
            game.night_log.append(
                Role::Seer,
                format!(
                    "{} looked at center cards {} and {}: {} and {}",
                    a,
                    first + 1,
                    second + 1,
                    cards[0].role,
                    cards[1].role
                ),
            );
            Some(ActionResult::ViewCenter { cards })
        }
        _ => None,
    }
}

fn apprentice_seer(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let index = single_center(game, actor, targets)?;
    let seen = center_view(game, index);
    game.night_log.append(
        Role::ApprenticeSeer,
        format!("{} looked at center card {}: {}", game.name_of(actor), index + 1, seen.role),
    );
    Some(ActionResult::ViewCenter { cards: vec![seen] })
}

// ── Paranormal Investigator ────────────────────────────────────────────

fn investigator(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let sel = split(game, actor, targets, false)?;
    if !sel.centers.is_empty() || sel.players.is_empty() || sel.players.len() > 2 {
        return None;
    }

    let a = game.name_of(actor);
    let mut viewed = Vec::new();
    let mut became_role = None;
    let mut notes = Vec::new();

    for &target in &sel.players {
        let t = game.name_of(target);
        if game.is_shielded(target) {
            notes.push(format!("{} (shielded)", t));
            viewed.push(InvestigatedCard { player: target, name: t, role: None, shielded: true });
            continue;
        }

        let role = current_role(game, target)?;
        notes.push(format!("{} ({})", t, role));
        viewed.push(InvestigatedCard { player: target, name: t, role: Some(role), shielded: false });

        // Seeing a wolf-team card or the Tanner ends the investigation.
        let turned = if role == Role::Tanner {
            Some(Role::Tanner)
        } else if role.is_wolf_team() {
            Some(Role::Werewolf)
        } else {
            None
        };
        if let Some(new_role) = turned {
            game.player_mut(actor)?.role = new_role;
            became_role = Some(new_role);
            break;
        }
    }

    let mut description = format!("{} investigated {}", a, notes.join(", then "));
    if let Some(role) = became_role {
        description.push_str(&format!(" and became a {}", role));
    }
    game.night_log.append(Role::ParanormalInvestigator, description);
    Some(ActionResult::PiResult { viewed, became_role })
}

// ── Card movers ────────────────────────────────────────────────────────

fn robber(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let target = single_other(game, actor, targets)?;
    let (a, t) = (game.name_of(actor), game.name_of(target));
    if game.is_shielded(target) {
        return Some(blocked(game, Role::Robber, &a, "rob", &t));
    }

    game.swap_roles(actor, target);
    let new_role = current_role(game, actor)?;
    game.night_log.append(Role::Robber, format!("{} robbed {} and became a {}", a, t, new_role));
    Some(ActionResult::SwapView { player: target, name: t, new_role })
}

fn witch(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    // Order matters: the center card first, then the optional player.
    let (index, player) = match targets {
        [Target::Center(i)] => (*i, None),
        [Target::Center(i), Target::Player(p)] => (*i, Some(*p)),
        _ => return None,
    };
    let sel = split(game, actor, targets, true)?;
    let index_usize = *sel.centers.first()?;
    let viewed = game.center[index_usize];
    let a = game.name_of(actor);

    let Some(target) = player else {
        game.night_log.append(
            Role::Witch,
            format!("{} looked at center card {}: {}", a, index_usize + 1, viewed),
        );
        return Some(ActionResult::WitchResult { index, viewed, swapped_with: None, blocked: false });
    };

    let t = game.name_of(target);
    if game.is_shielded(target) {
        game.night_log.append(
            Role::Witch,
            format!(
                "{} looked at center card {} ({}) but could not swap it with {}, whose card was shielded",
                a,
                index_usize + 1,
                viewed,
                t
            ),
        );
        return Some(ActionResult::WitchResult { index, viewed, swapped_with: None, blocked: true });
    }

    let old = current_role(game, target)?;
    game.swap_with_center(target, index_usize)?;
    game.night_log.append(
        Role::Witch,
        format!(
            "{} looked at center card {} ({}) and swapped it with {}'s {}",
            a,
            index_usize + 1,
            viewed,
            t,
            old
        ),
    );
    Some(ActionResult::WitchResult { index, viewed, swapped_with: Some(t), blocked: false })
}

fn troublemaker(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let sel = split(game, actor, targets, false)?;
    let (first, second) = match (sel.players.as_slice(), sel.centers.as_slice()) {
        (&[first, second], []) => (first, second),
        _ => return None,
    };

    let (a, f, s) = (game.name_of(actor), game.name_of(first), game.name_of(second));
    if game.is_shielded(first) || game.is_shielded(second) {
        let shielded = if game.is_shielded(first) { f } else { s };
        return Some(blocked(game, Role::Troublemaker, &a, "swap", &shielded));
    }

    let (rf, rs) = (current_role(game, first)?, current_role(game, second)?);
    game.swap_roles(first, second);
    game.night_log.append(
        Role::Troublemaker,
        format!("{} swapped the cards of {} ({}) and {} ({})", a, f, rf, s, rs),
    );
    Some(ActionResult::Swap { first: f, second: s })
}

fn drunk(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let index = single_center(game, actor, targets)?;
    let new_role = game.swap_with_center(actor, index)?;
    game.night_log.append(
        Role::Drunk,
        format!(
            "{} swapped their card with center card {} and became a {}",
            game.name_of(actor),
            index + 1,
            new_role
        ),
    );
    Some(ActionResult::SwapCenter { index: index as u8 })
}

// ── Revealer ───────────────────────────────────────────────────────────

fn revealer(game: &mut Game, actor: PlayerId, targets: &[Target]) -> Option<ActionResult> {
    let target = single_other(game, actor, targets)?;
    let (a, t) = (game.name_of(actor), game.name_of(target));
    if game.is_shielded(target) {
        return Some(blocked(game, Role::Revealer, &a, "reveal", &t));
    }

    let role = current_role(game, target)?;
    let flipped = role.is_wolf_team() || role == Role::Tanner;
    if flipped {
        game.revealed.insert(target);
        game.night_log.append(
            Role::Revealer,
            format!("{} flipped {}'s card face up for everyone: {}", a, t, role),
        );
    } else {
        game.night_log.append(
            Role::Revealer,
            format!("{} looked at {}'s card ({}) and turned it back over", a, t, role),
        );
    }
    Some(ActionResult::Reveal { player: target, name: t, role, flipped })
}
