//! Gold ledger and action cooldowns.
//!
//! Everything here mutates a borrowed player record and is only ever called
//! from inside a profile-store mutator, which is what makes the adjustments
//! atomic.

use chrono::{DateTime, Utc};

use crate::rpg::errors::RpgError;
use crate::rpg::types::{CooldownKey, CounterKind, PlayerRecord};

/// Add gold. Lifetime earnings feed the `gold_earned` counter.
pub fn credit(player: &mut PlayerRecord, amount: u64) {
    player.gold = player.gold.saturating_add(amount);
    player.counters.bump(CounterKind::GoldEarned, amount);
}

/// Remove gold, failing without mutation when the balance is short.
pub fn debit(player: &mut PlayerRecord, amount: u64) -> Result<(), RpgError> {
    if player.gold < amount {
        return Err(RpgError::InsufficientGold);
    }
    player.gold -= amount;
    Ok(())
}

/// Seconds left on a cooldown; 0 when elapsed or never stamped.
pub fn check_cooldown(
    player: &PlayerRecord,
    key: CooldownKey,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> i64 {
    match player.cooldowns.get(key) {
        None => 0,
        Some(last) => {
            let elapsed = now.signed_duration_since(last).num_seconds();
            (cooldown_seconds - elapsed).max(0)
        }
    }
}

/// Gate an action on a cooldown, returning `OnCooldown` with the remaining
/// seconds when it has not elapsed.
pub fn require_off_cooldown(
    player: &PlayerRecord,
    key: CooldownKey,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> Result<(), RpgError> {
    let remaining = check_cooldown(player, key, cooldown_seconds, now);
    if remaining > 0 {
        return Err(RpgError::OnCooldown {
            remaining_seconds: remaining,
        });
    }
    Ok(())
}

pub fn stamp_cooldown(player: &mut PlayerRecord, key: CooldownKey, now: DateTime<Utc>) {
    player.cooldowns.set(key, now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpg::types::ClassKind;
    use chrono::Duration;

    fn player() -> PlayerRecord {
        PlayerRecord::new("tester", ClassKind::Warrior, Utc::now())
    }

    #[test]
    fn credit_and_debit_balance() {
        let mut p = player();
        assert_eq!(p.gold, 100);
        credit(&mut p, 50);
        assert_eq!(p.gold, 150);
        assert_eq!(p.counters.get(CounterKind::GoldEarned), 50);

        debit(&mut p, 120).expect("debit");
        assert_eq!(p.gold, 30);
        assert!(matches!(debit(&mut p, 31), Err(RpgError::InsufficientGold)));
        assert_eq!(p.gold, 30); // untouched on failure
    }

    #[test]
    fn cooldown_lifecycle() {
        let mut p = player();
        let now = Utc::now();
        assert_eq!(check_cooldown(&p, CooldownKey::Work, 3600, now), 0);

        stamp_cooldown(&mut p, CooldownKey::Work, now);
        let remaining = check_cooldown(&p, CooldownKey::Work, 3600, now + Duration::seconds(600));
        assert_eq!(remaining, 3000);

        let gate = require_off_cooldown(&p, CooldownKey::Work, 3600, now + Duration::seconds(600));
        assert!(matches!(gate, Err(RpgError::OnCooldown { remaining_seconds: 3000 })));

        assert_eq!(
            check_cooldown(&p, CooldownKey::Work, 3600, now + Duration::seconds(3601)),
            0
        );
    }
}
