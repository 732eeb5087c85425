//! Compiled-in storefront catalog and login credentials.

/// Product identifiers available in the target storefront.
///
/// Cart-add actions pick from these uniformly at random.
pub const PRODUCTS: [&str; 9] = [
    "99", // Adventurer GPS Watch
    "95", // AeroLite Cycling Helmet
    "88", // Alpine AlpinePack Backpack
    "3",  // Alpine Fusion Goggles
    "28", // Alpine Peak Down Jacket
    "18", // Alpine Tech Crampons
    "17", // Apex Climbing Harness
    "74", // Apex Climbing Harness
    "49", // Arctic Shield Insulated Jacket
];

/// A username/password combination used to authenticate a simulated user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Credentials {
    /// The account name typed into the login form.
    pub username: &'static str,
    /// The account password typed into the login form.
    pub password: &'static str,
}

/// The accounts that exist in the target storefront.
pub const AUTH_USERS: [Credentials; 2] = [
    Credentials {
        username: "alice",
        password: "Pass123$",
    },
    Credentials {
        username: "bob",
        password: "Pass123$",
    },
];

/// Selects the credential pair for a user sequence number.
///
/// Even sequence numbers log in as the first account, odd ones as the
/// second, so concurrent users alternate between the two accounts.
pub fn credentials_for(sequence: u64) -> Credentials {
    AUTH_USERS[(sequence % 2) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_alternate_with_parity() {
        assert_eq!(credentials_for(0).username, "alice");
        assert_eq!(credentials_for(1).username, "bob");
        assert_eq!(credentials_for(2).username, "alice");
        assert_eq!(credentials_for(u64::MAX).username, "bob");
    }

    #[test]
    fn all_accounts_share_the_demo_password() {
        for account in AUTH_USERS {
            assert_eq!(account.password, "Pass123$");
        }
    }
}
