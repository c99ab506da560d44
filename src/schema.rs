table! {
    lots (lot_id) {
        lot_id -> Uuid,
        name -> VarChar,
        slug -> VarChar,
        description -> Nullable<Text>,
        description_tag -> Nullable<VarChar>,
        location -> VarChar,
        latitude -> Nullable<Double>,
        longitude -> Nullable<Double>,
        phone -> VarChar,
        space_count -> Integer,
        open_time -> Nullable<Time>,
        close_time -> Nullable<Time>,
        is_24_hours -> Bool,
        amenities -> Array<Text>,
        images -> Array<Text>,
        status -> VarChar,
        created_at -> Timestamp, // UTC 0, generated at db level
        updated_at -> Timestamp, // UTC 0, generated at db level
    }
}

table! {
    lot_staff (lot_id, user_id) {
        lot_id -> Uuid,
        user_id -> Uuid,
        position -> VarChar,
        created_at -> Timestamp,
    }
}

table! {
    schedules (schedule_id) {
        schedule_id -> Uuid,
        lot_id -> Uuid,
        name -> VarChar,
        slug -> VarChar,
        description -> Nullable<Text>,
        is_event -> Bool,
        days -> Array<SmallInt>, // ISO weekdays, Monday = 1
        start_time -> Nullable<Time>,
        end_time -> Nullable<Time>,
        event_start -> Nullable<Timestamp>, // lot local time
        event_end -> Nullable<Timestamp>, // lot local time
        created_at -> Timestamp,
    }
}

table! {
    price_tiers (price_id) {
        price_id -> Uuid,
        schedule_id -> Uuid,
        max_hours -> Integer,
        price -> BigInt, // cents
        created_at -> Timestamp,
    }
}

table! {
    orders (order_id) {
        order_id -> Uuid,
        lot_id -> Uuid,
        schedule_id -> Uuid,
        price_tier -> Nullable<Uuid>,
        email -> VarChar,
        phone -> VarChar,
        license_plate -> VarChar,
        license_state -> VarChar,
        vehicle_type -> VarChar,
        start_time -> Timestamp, // lot local time
        end_time -> Timestamp, // lot local time
        total_amount -> BigInt, // cents
        payment_status -> VarChar,
        stripe_payment_intent_id -> VarChar,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    users (user_id) {
        user_id -> Uuid,
        email -> VarChar,
        full_name -> Nullable<VarChar>,
        phone -> Nullable<VarChar>,
        role -> VarChar,
        created_at -> Timestamp,
    }
}

joinable!(lot_staff -> lots (lot_id));
joinable!(lot_staff -> users (user_id));
joinable!(schedules -> lots (lot_id));
joinable!(price_tiers -> schedules (schedule_id));
joinable!(orders -> lots (lot_id));
joinable!(orders -> schedules (schedule_id));
allow_tables_to_appear_in_same_query!(lots, lot_staff, schedules, price_tiers, orders, users);
