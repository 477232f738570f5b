diesel::table! {
    account_types (id) {
        id -> Uuid,
        name -> Varchar,
        interest_rate -> Numeric,
    }
}

diesel::table! {
    accounts (id) {
        id -> Uuid,
        user_id -> Uuid,
        number -> Varchar,
        type_id -> Uuid,
        balance -> Numeric,
        opened_on -> Date,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    loans (id) {
        id -> Uuid,
        user_id -> Uuid,
        account_number -> Nullable<Varchar>,
        principal -> Numeric,
        term_months -> Int2,
        interest_rate -> Int2,
        monthly_payment -> Numeric,
        status -> Varchar,
        applied_at -> Timestamptz,
        approved_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    transactions (id) {
        id -> Uuid,
        account_id -> Uuid,
        transaction_type -> Varchar,
        amount -> Numeric,
        description -> Varchar,
        counterparty -> Nullable<Varchar>,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        user_no -> Int4,
        role -> Varchar,
        full_name -> Varchar,
        email -> Varchar,
        phone -> Nullable<Varchar>,
        password_hash -> Varchar,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(accounts -> users (user_id));
diesel::joinable!(accounts -> account_types (type_id));
diesel::joinable!(transactions -> accounts (account_id));
diesel::joinable!(loans -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    account_types,
    accounts,
    loans,
    transactions,
    users,
);
