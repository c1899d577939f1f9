// Maintained by hand alongside DieselDbContext::init_schema.

diesel::table! {
    contacts (id) {
        id -> Text,
        upload_id -> Text,
        business_name -> Nullable<Text>,
        email -> Nullable<Text>,
        website -> Nullable<Text>,
        state -> Nullable<Text>,
        zip -> Nullable<Text>,
        scrape_method -> Nullable<Text>,
        status -> Text,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    scraped_data (id) {
        id -> Text,
        contact_id -> Text,
        method -> Text,
        discovered_url -> Nullable<Text>,
        search_query -> Nullable<Text>,
        homepage_content -> Nullable<Text>,
        homepage_markup -> Nullable<Text>,
        services_url -> Nullable<Text>,
        services_content -> Nullable<Text>,
        products_url -> Nullable<Text>,
        products_content -> Nullable<Text>,
        contact_url -> Nullable<Text>,
        contact_content -> Nullable<Text>,
        emails -> Text,
        phones -> Text,
        page_title -> Nullable<Text>,
        meta_description -> Nullable<Text>,
        scrape_success -> Integer,
        error_message -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::joinable!(scraped_data -> contacts (contact_id));

diesel::allow_tables_to_appear_in_same_query!(contacts, scraped_data);
