// SQLite schema. Timestamps are stored as RFC 3339 text in UTC with a fixed
// sub-second width so that lexicographic comparison matches chronological
// order.

diesel::table! {
    messages (id) {
        id -> BigInt,
        guild_id -> BigInt,
        channel_id -> BigInt,
        author -> BigInt,
        url -> Text,
        timestamp -> Text,
        total_reactions -> Integer,
    }
}

diesel::table! {
    reactions (id) {
        id -> Integer,
        message_id -> BigInt,
        emoji -> Text,
        reaction_count -> Integer,
        reaction_id -> Nullable<BigInt>,
    }
}

diesel::table! {
    opted_out_users (user_id) {
        user_id -> BigInt,
        opted_out_at -> Text,
    }
}

diesel::table! {
    scheduled_jobs (id) {
        id -> Text,
        cron_expression -> Text,
        interval_hours -> Double,
        channel_id -> BigInt,
        guild_id -> BigInt,
        count -> Integer,
        next_run -> Text,
        created_at -> Text,
        is_forum -> Bool,
        thread_title_template -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(messages, reactions, opted_out_users, scheduled_jobs);
